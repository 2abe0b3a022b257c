use thiserror::Error;

pub type Result<T> = std::result::Result<T, RockSolidError>;

#[derive(Debug, Error)]
pub enum RockSolidError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RockSolidError {
    fn from(err: reqwest::Error) -> Self {
        RockSolidError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RockSolidError {
    fn from(err: serde_json::Error) -> Self {
        RockSolidError::Parse(err.to_string())
    }
}

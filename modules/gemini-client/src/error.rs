use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeminiError>;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {body}")]
    Api {
        status: u16,
        body: String,
        raw_request: String,
    },

    #[error("Gemini returned no candidates")]
    EmptyResponse {
        raw_request: String,
        raw_response: String,
    },

    #[error("Response schema violation: {message}")]
    Schema {
        raw_request: String,
        raw_response: String,
        message: String,
    },
}

impl GeminiError {
    /// The serialized outbound request, when the call got far enough to
    /// build one. Kept for audit storage alongside the failure.
    pub fn raw_request(&self) -> Option<&str> {
        match self {
            GeminiError::Network(_) => None,
            GeminiError::Api { raw_request, .. }
            | GeminiError::EmptyResponse { raw_request, .. }
            | GeminiError::Schema { raw_request, .. } => Some(raw_request),
        }
    }

    /// The raw inbound body, when one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            GeminiError::Network(_) => None,
            GeminiError::Api { body, .. } => Some(body),
            GeminiError::EmptyResponse { raw_response, .. }
            | GeminiError::Schema { raw_response, .. } => Some(raw_response),
        }
    }
}

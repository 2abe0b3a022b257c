use thiserror::Error;

/// Error taxonomy for the analysis pipeline. Synchronous rejections
/// (InvalidArgument, PermissionDenied) never reach the queue; Internal is
/// recorded as a request's failure reason and surfaced to the poller.
#[derive(Error, Debug)]
pub enum ClipsightError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ClipsightError {
    fn from(err: anyhow::Error) -> Self {
        ClipsightError::Internal(format!("{err:#}"))
    }
}

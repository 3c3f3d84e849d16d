use std::fmt;

/// Failure of a remote call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never got an HTTP answer
    Transport(String),
    /// Non-success status, with the server's `{error}` message when present
    Status { status: u16, message: String },
    /// The body did not have the expected shape
    Decode(String),
    /// The outbox was closed before the mutation ran
    Closed,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ApiError::Status { status, message } => write!(f, "HTTP {}: {}", status, message),
            ApiError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ApiError::Closed => write!(f, "Outbox closed"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

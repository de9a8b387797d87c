//! API error types with transient/permanent classification.

use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by remote object-store operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to reach the server.
    #[error("network error: {message}")]
    Network { message: String },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Credentials rejected or session expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server rejected the call.
    #[error("server error (status {code}): {message}")]
    Server { code: u16, message: String },

    /// The server answered with a payload that could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Retry policy lives in the client, not in callers; this is exposed
    /// so callers can distinguish outage from rejection when reporting.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network { .. } | ApiError::Timeout => true,
            ApiError::Server { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network {
                message: e.to_string(),
            }
        }
    }
}

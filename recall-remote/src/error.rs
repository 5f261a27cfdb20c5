//! Remote API error types.

use recall_core::RecallError;
use thiserror::Error;

/// Errors from the remote memory API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The API answered with a non-success status.
    #[error("Remote memory API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Request timed out.
    #[error("Remote memory request timed out after {0}ms")]
    Timeout(u64),

    /// The API could not be reached.
    #[error("Remote memory API unavailable: {0}")]
    Unavailable(String),

    /// Any other transport failure.
    #[error("Remote memory request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the expected JSON.
    #[error("Failed to parse remote memory response: {0}")]
    ParseError(String),

    /// Client could not be built from its settings.
    #[error("Remote memory configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout(0)
        } else if err.is_connect() {
            RemoteError::Unavailable(err.to_string())
        } else if err.is_decode() {
            RemoteError::ParseError(err.to_string())
        } else {
            RemoteError::RequestFailed(err.to_string())
        }
    }
}

impl From<RemoteError> for RecallError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::ConfigError(msg) => RecallError::Config(msg),
            other => RecallError::Remote(other.to_string()),
        }
    }
}

//! Error types for the recall core library.

use thiserror::Error;

/// Top-level error type for all recall operations.
#[derive(Error, Debug)]
pub enum RecallError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied something the store cannot accept.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote memory API rejected a call or could not be reached.
    ///
    /// The client absorbs these into the fallback latch; they only surface
    /// when a remote backend is called directly.
    #[error("Remote memory API error: {0}")]
    Remote(String),

    /// Generic I/O error (local memory file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for RecallError {
    fn from(err: serde_json::Error) -> Self {
        RecallError::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, RecallError>;

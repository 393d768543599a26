//! Error types for oficina-core

use thiserror::Error;

/// Result type alias using oficina-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in oficina-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store call failed; the message is opaque to the engine
    #[error("Remote error: {0}")]
    Remote(String),

    /// Remote store call exceeded the configured timeout
    #[error("Remote call timed out")]
    RemoteTimeout,

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from the remote collaborator.
    ///
    /// Remote failures are recorded per queue entry and retried on a later
    /// sync; everything else is fatal to the operation that hit it.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::RemoteTimeout)
    }
}

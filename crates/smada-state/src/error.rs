//! Error types for smada-state

use thiserror::Error;

/// Errors raised by a `StateStore` backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failure
    #[error("state storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be decoded
    #[error("stored state is corrupt: {reason}")]
    Corrupt { reason: String },

    /// Stored document was written by a newer schema
    #[error("unsupported state schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// Document could not be encoded
    #[error("state serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Errors raised by the state container
#[derive(Error, Debug)]
pub enum StateError {
    /// Persistence failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No catalog action with this code
    #[error("unknown action code: {0}")]
    UnknownAction(String),

    /// Only accepted attempts are recorded
    #[error("attendance attempt was not accepted: {verdict}")]
    AttemptRejected { verdict: String },
}

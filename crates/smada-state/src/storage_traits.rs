//! Storage trait definitions for SMADA
//!
//! `StateStore` persists the whole application document. It is async and
//! backend-agnostic; an in-memory fake lives in the `fakes` module and a
//! JSON file backend in `fs_store`.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::{AppState, SCHEMA_VERSION};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Whole-document state persistence.
///
/// Guarantees:
/// - `load()` returns `None` when nothing has been saved yet.
/// - `load()` after `save(state)` returns a value equal to `state`.
/// - `save` replaces the previous document entirely.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stored document, if any.
    async fn load(&self) -> StorageResult<Option<AppState>>;

    /// Persist `state`, replacing any previous document.
    async fn save(&self, state: &AppState) -> StorageResult<()>;
}

/// Reject documents written by a newer layout.
pub fn check_schema_version(state: &AppState) -> StorageResult<()> {
    if state.schema_version > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema {
            found: state.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

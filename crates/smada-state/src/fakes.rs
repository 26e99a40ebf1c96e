//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryStateStore` satisfies the `StateStore` contract without touching
//! the filesystem, and counts saves so tests can assert persistence calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::schema::AppState;
use crate::storage_traits::*;

/// In-memory state store backed by a `Mutex<Option<AppState>>`.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<AppState>>,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `state` already stored.
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> StorageResult<Option<AppState>> {
        let state = self.state.lock().unwrap().clone();
        if let Some(state) = &state {
            check_schema_version(state)?;
        }
        Ok(state)
    }

    async fn save(&self, state: &AppState) -> StorageResult<()> {
        *self.state.lock().unwrap() = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! JSON file backend for `StateStore`.
//!
//! The whole document lives in one pretty-printed JSON file. Saves write to
//! a temp file in the same directory and rename it over the target, so a
//! crash mid-write never leaves a truncated document behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::schema::AppState;
use crate::storage_traits::{check_schema_version, StateStore, StorageResult};

/// File-backed state store.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> StorageResult<Option<AppState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file yet");
                return Ok(None);
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let state: AppState =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                reason: format!("{}: {}", self.path.display(), e),
            })?;
        check_schema_version(&state)?;
        debug!(
            event = "state.loaded",
            path = %self.path.display(),
            schema_version = state.schema_version,
        );
        Ok(Some(state))
    }

    async fn save(&self, state: &AppState) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(state)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &data))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        debug!(event = "state.saved", path = %self.path.display());
        Ok(())
    }
}

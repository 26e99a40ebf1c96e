//! SMADA State: application state and persistence
//!
//! Owns the student profile, point ledger and attendance log, and persists
//! them as one JSON document behind an async storage port.
//!
//! ## Key Components
//!
//! - `StateContainer`: single owner of `AppState`; every mutation is saved
//! - `StateStore`: persistence port, with `JsonFileStateStore` and the
//!   in-memory `MemoryStateStore`
//! - `REWARD_TYPES` / `VIOLATION_TYPES`: the teacher panel's action catalog

pub mod catalog;
pub mod container;
mod error;
pub mod fakes;
pub mod fs_store;
mod schema;
pub mod storage_traits;

pub use catalog::{find_action, ActionType, REWARD_TYPES, VIOLATION_TYPES};
pub use container::{StateContainer, StudentStats, MANUAL_ACTION_DESCRIPTION};
pub use error::{StateError, StorageError};
pub use fakes::MemoryStateStore;
pub use fs_store::JsonFileStateStore;
pub use schema::{
    AppState, AttendanceRecord, AttendanceStatus, PointKind, PointLog, Student, SCHEMA_VERSION,
};
pub use storage_traits::{StateStore, StorageResult};

/// Result type for smada-state operations
pub type Result<T> = std::result::Result<T, StateError>;

//! Error types for persistence operations.

use std::path::PathBuf;
use thiserror::Error;

use greenlight_models::EntityKind;

/// Errors that can occur during persistence operations.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to read from the file system.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write to the file system.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize JSON.
    #[error("failed to serialize: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Entity not found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A record read by this unit of work changed before commit.
    #[error("concurrent update of {kind} {id}, retry the operation")]
    Conflict { kind: EntityKind, id: String },

    /// Lock poisoned (a thread panicked while holding the lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl PersistenceError {
    /// True for commit-time version conflicts, which are safe to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PersistenceError::Conflict { .. })
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

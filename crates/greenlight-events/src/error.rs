//! Error types for event delivery plumbing.

use thiserror::Error;

/// Errors internal to the event plumbing.
///
/// These never reach the workflow core: [`crate::Notify`] is infallible and
/// implementations handle (and log) these themselves.
#[derive(Error, Debug)]
pub enum EventError {
    /// Lock poisoned (a thread panicked while holding the lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

//! Error taxonomy for workflow operations.

use thiserror::Error;

use greenlight_models::EntityKind;
use greenlight_persistence::PersistenceError;
use greenlight_policy::DenyReason;

/// Errors surfaced by [`crate::WorkflowService`].
///
/// Business-rule violations arrive as typed values, never as raw collaborator
/// failures: the boundary layer maps `Denied` to 400/403, `NotFound` to 404,
/// `Conflict` to a retryable 409, and `Store` to an opaque 500.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// A policy rule refused the operation. The reason text is client-visible.
    #[error("{0}")]
    Denied(#[from] DenyReason),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The requested state change is not allowed by the state machine.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The operation kept losing the commit race; safe to retry.
    #[error("the operation conflicted with concurrent updates, retry")]
    Conflict,

    /// No authenticated actor could be resolved.
    #[error("no authenticated actor")]
    Unauthenticated,

    /// Opaque infrastructure failure from the persistence collaborator.
    #[error("storage failure: {0}")]
    Store(PersistenceError),
}

impl From<PersistenceError> for WorkflowError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { kind, id } => WorkflowError::NotFound { kind, id },
            err if err.is_conflict() => WorkflowError::Conflict,
            err => WorkflowError::Store(err),
        }
    }
}

/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

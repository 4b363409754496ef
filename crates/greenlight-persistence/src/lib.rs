//! Persistence layer for Greenlight.
//!
//! The [`Workspace`] is a thread-safe, versioned in-memory store for the
//! whole entity graph. Workflow operations run inside a [`UnitOfWork`],
//! which records the version of everything it reads and commits its staged
//! writes atomically only if none of those records moved in the meantime —
//! the optimistic check that makes concurrent sibling completions safe.
//!
//! [`SnapshotStore`] persists the workspace to disk as a single JSON
//! document using atomic temp-file-and-rename writes.
//!
//! # Example
//!
//! ```
//! use greenlight_persistence::Workspace;
//! use greenlight_models::{Actor, Project};
//!
//! let store = Workspace::new();
//! let manager = Actor::new("maria", 4);
//! store.put_actor(manager.clone()).unwrap();
//!
//! let mut uow = store.begin();
//! uow.save_project(Project::new("Rollout", manager.id.clone()));
//! uow.commit().unwrap();
//! ```

pub mod error;
pub mod snapshot;
pub mod store;
pub mod uow;

pub use error::{PersistenceError, Result};
pub use snapshot::{SnapshotStore, WorkspaceSnapshot};
pub use store::Workspace;
pub use uow::UnitOfWork;

//! Approval workflow, cascade completion, and orchestration for Greenlight.
//!
//! [`WorkflowService`] is the externally exposed surface: create, update,
//! approve, complete, and delete operations over the client/project/epic/
//! story hierarchy. Each operation runs as one atomic unit of work
//! (load, authorize, mutate, cascade, commit); queued notices go out only
//! after the commit succeeds, and commit conflicts are retried a bounded
//! number of times before surfacing as a transient error.

pub mod approval;
pub mod cascade;
pub mod clock;
pub mod config;
pub mod dto;
pub mod error;
pub mod identity;
pub mod service;

pub use approval::ApprovalWorkflow;
pub use cascade::{CascadeEngine, CascadeResult};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::WorkflowConfig;
pub use dto::{EpicPatch, NewClient, NewEpic, NewProject, NewStory, ProjectPatch, StoryPatch};
pub use error::{Result, WorkflowError};
pub use identity::{Identity, StaticIdentity};
pub use service::{CompletionOutcome, WorkflowService};

//! Core data models for Greenlight.
//!
//! This crate provides the fundamental data types used throughout the
//! Greenlight system: actors with access levels, the client/project/epic/
//! story hierarchy, approval state, and notification payloads.

pub mod actor;
pub mod builders;
pub mod hierarchy;
pub mod ids;
pub mod notice;

// Re-export main types
pub use actor::{Actor, Role, RoleDetails, SENIOR_ACCESS_LEVEL};
pub use builders::{EpicBuilder, ProjectBuilder, StoryBuilder};
pub use hierarchy::{
    ApprovalState, Client, EntityKind, Epic, Project, SlaPriority, SlaRule, SlaStartPoint, Story,
};
pub use ids::{ActorId, ClientId, EpicId, ProjectId, SlaRuleId, StoryId};
pub use notice::{EntityRef, Notice, NoticeKind};

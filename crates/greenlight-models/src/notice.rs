//! Notification payloads emitted by the workflow core.
//!
//! A [`Notice`] is a description of something worth telling a user about.
//! Delivery (email, websocket, database inbox) belongs to collaborators
//! behind the notification seam; the core only produces these values.

use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, EpicId, ProjectId, StoryId};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A story was assigned to an actor.
    StoryAssigned,
    /// A story reached its completion date.
    StoryCompleted,
    /// An epic was explicitly approved.
    EpicApproved,
    /// An epic auto-completed because all of its stories finished.
    EpicCompleted,
    /// A project auto-completed because all of its epics finished.
    ProjectCompleted,
    /// A project was created already approved.
    ProjectCreated,
}

/// Which entity the notice is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum EntityRef {
    Project(ProjectId),
    Epic(EpicId),
    Story(StoryId),
}

/// A single notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// What happened.
    pub kind: NoticeKind,

    /// The entity the notice is about.
    pub entity: EntityRef,

    /// Who should hear about it, when a recipient could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ActorId>,

    /// Human-readable summary.
    pub message: String,
}

impl Notice {
    /// Creates a notice with a resolved recipient.
    pub fn to_recipient(
        kind: NoticeKind,
        entity: EntityRef,
        recipient: ActorId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity,
            recipient: Some(recipient),
            message: message.into(),
        }
    }

    /// Creates a notice with no resolvable recipient.
    pub fn broadcast(kind: NoticeKind, entity: EntityRef, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity,
            recipient: None,
            message: message.into(),
        }
    }
}

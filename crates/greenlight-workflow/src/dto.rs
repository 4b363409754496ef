//! Inbound payloads for the workflow operations.
//!
//! Creation DTOs carry the fields a caller may set; patch DTOs are sparse —
//! `None` means "leave unchanged". The creator is never taken from the
//! payload: the service stamps the authenticated actor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use greenlight_models::{ActorId, ClientId, EpicId, ProjectId};

/// Payload for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    /// The managing actor. Restricted by the creator's access level.
    pub manager: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

/// Payload for creating an epic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEpic {
    pub name: String,
    pub project: ProjectId,
    /// The managing actor. Restricted by the creator's access level.
    pub manager: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

/// Payload for creating a story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStory {
    pub title: String,
    pub epic: EpicId,
    /// The assigned actor. Restricted by the creator's access level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
}

/// Payload for creating a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Sparse update for a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// `Some(true)` requests approval; `Some(false)` is always rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl ProjectPatch {
    /// True if the patch touches fields gated behind approval.
    pub fn touches_work_fields(&self) -> bool {
        self.deliverables.is_some()
    }
}

/// Sparse update for an epic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpicPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// `Some(true)` requests approval; `Some(false)` is always rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl EpicPatch {
    /// True if the patch touches fields gated behind approval.
    pub fn touches_work_fields(&self) -> bool {
        self.deliverables.is_some() || self.start_date.is_some()
    }
}

/// Sparse update for a story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
    /// `Some(true)` requests approval; `Some(false)` is always rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl StoryPatch {
    /// True if the patch touches fields gated behind approval.
    pub fn touches_work_fields(&self) -> bool {
        self.deliverables.is_some()
    }

    /// True if the patch changes anything besides the approval flag.
    pub fn touches_non_approval_fields(&self) -> bool {
        self.title.is_some()
            || self.assignee.is_some()
            || self.deliverables.is_some()
            || self.due_date.is_some()
            || self.deadline.is_some()
            || self.estimated_hours.is_some()
            || self.actual_hours.is_some()
    }
}

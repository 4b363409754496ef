//! The client/project/epic/story hierarchy.
//!
//! Parents own children by id, not by embedding: a [`Story`] holds the id of
//! its [`Epic`], an [`Epic`] the id of its [`Project`]. There are no back
//! references from parent to child; child collections are resolved through
//! the persistence accessors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ActorId, ClientId, EpicId, ProjectId, SlaRuleId, StoryId};

/// Entity kinds, used by policy decisions, errors, and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Actor,
    Client,
    Project,
    Epic,
    Story,
    SlaRule,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Actor => "actor",
            EntityKind::Client => "client",
            EntityKind::Project => "project",
            EntityKind::Epic => "epic",
            EntityKind::Story => "story",
            EntityKind::SlaRule => "sla rule",
        };
        write!(f, "{}", name)
    }
}

/// Approval and completion state, coupled by construction.
///
/// `end_date` is non-null iff `approved`: the only mutation is
/// [`ApprovalState::approve`], which stamps the completion date exactly once.
/// There is no way to clear approval, which makes the two-state machine
/// (`Pending` -> `Completed`) monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApprovalState {
    /// Whether the entity has been approved.
    pub approved: bool,

    /// Completion date, stamped when approval is first applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl ApprovalState {
    /// A fresh, unapproved state.
    pub fn pending() -> Self {
        Self::default()
    }

    /// True once the completion date has been stamped.
    pub fn is_complete(&self) -> bool {
        self.end_date.is_some()
    }

    /// Applies approval as of `today`.
    ///
    /// Idempotent: if already approved nothing changes. The completion date
    /// is written only if absent, so it can never move once set.
    ///
    /// # Returns
    ///
    /// `true` if this call changed the state.
    pub fn approve(&mut self, today: NaiveDate) -> bool {
        if self.approved {
            return false;
        }
        self.approved = true;
        if self.end_date.is_none() {
            self.end_date = Some(today);
        }
        true
    }
}

/// A client the work is done for. Owns projects by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Client {
    /// Creates a new client with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
        }
    }
}

/// A project under a client, composed of epics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,

    /// Display name.
    pub name: String,

    /// Owning client, if any. Weak reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientId>,

    /// The actor who created the project. Absent on legacy rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<ActorId>,

    /// The managing actor. Required.
    pub manager: ActorId,

    /// Free-form description of what the project delivers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,

    /// Agreed delivery deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    /// Approval/completion state.
    #[serde(flatten)]
    pub approval: ApprovalState,
}

impl Project {
    /// Creates a new pending project.
    pub fn new(name: impl Into<String>, manager: ActorId) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            client: None,
            creator: None,
            manager,
            deliverables: None,
            deadline: None,
            approval: ApprovalState::pending(),
        }
    }

    /// True once the project's completion date is stamped.
    pub fn is_complete(&self) -> bool {
        self.approval.is_complete()
    }
}

/// An epic inside a project, composed of stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    /// Unique identifier.
    pub id: EpicId,

    /// The project this epic belongs to. Weak reference.
    pub project: ProjectId,

    /// The managing actor.
    pub manager: ActorId,

    /// The actor who created the epic. Absent on legacy rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<ActorId>,

    /// Display name.
    pub name: String,

    /// Date work started, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Agreed delivery deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    /// Free-form description of what the epic delivers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,

    /// Approval/completion state.
    #[serde(flatten)]
    pub approval: ApprovalState,
}

impl Epic {
    /// Creates a new pending epic under `project`.
    pub fn new(name: impl Into<String>, project: ProjectId, manager: ActorId) -> Self {
        Self {
            id: EpicId::new(),
            project,
            manager,
            creator: None,
            name: name.into(),
            start_date: None,
            deadline: None,
            deliverables: None,
            approval: ApprovalState::pending(),
        }
    }

    /// True once the epic's completion date is stamped.
    pub fn is_complete(&self) -> bool {
        self.approval.is_complete()
    }
}

/// A story inside an epic: the unit of assignable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Unique identifier.
    pub id: StoryId,

    /// The epic this story belongs to. Weak reference.
    pub epic: EpicId,

    /// The owning project, denormalized for lookups. Weak reference.
    pub project: ProjectId,

    /// The actor the story is assigned to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<ActorId>,

    /// The actor who created the story. Absent on legacy rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<ActorId>,

    /// Short title.
    pub title: String,

    /// Free-form description of the work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,

    /// Date the story is due.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Hard deadline, if distinct from the due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    /// Estimated effort in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,

    /// Actual effort in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,

    /// Approval/completion state.
    #[serde(flatten)]
    pub approval: ApprovalState,
}

impl Story {
    /// Creates a new pending story under `epic` in `project`.
    pub fn new(title: impl Into<String>, epic: EpicId, project: ProjectId) -> Self {
        Self {
            id: StoryId::new(),
            epic,
            project,
            assignee: None,
            creator: None,
            title: title.into(),
            deliverables: None,
            due_date: None,
            deadline: None,
            estimated_hours: None,
            actual_hours: None,
            approval: ApprovalState::pending(),
        }
    }

    /// True once the story's completion date is stamped.
    pub fn is_complete(&self) -> bool {
        self.approval.is_complete()
    }
}

/// Where an SLA measurement window starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStartPoint {
    TaskCreation,
    StateEntry,
}

/// SLA escalation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaPriority {
    Low,
    Medium,
    High,
}

/// A service-level rule scoped to a project or an epic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaRule {
    pub id: SlaRuleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic: Option<EpicId>,
    pub duration_hours: u32,
    pub start_point: SlaStartPoint,
    pub escalation_delay_hours: u32,
    pub priority: SlaPriority,
    pub notify_email: bool,
}

impl SlaRule {
    /// Creates a project-scoped rule.
    pub fn for_project(project: ProjectId, duration_hours: u32) -> Self {
        Self {
            id: SlaRuleId::new(),
            project: Some(project),
            epic: None,
            duration_hours,
            start_point: SlaStartPoint::TaskCreation,
            escalation_delay_hours: 0,
            priority: SlaPriority::Medium,
            notify_email: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ActorId;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, n).unwrap()
    }

    #[test]
    fn test_approve_stamps_end_date_once() {
        let mut state = ApprovalState::pending();
        assert!(!state.is_complete());

        assert!(state.approve(day(1)));
        assert!(state.approved);
        assert_eq!(state.end_date, Some(day(1)));

        // Re-approval is a no-op; the date never moves.
        assert!(!state.approve(day(9)));
        assert_eq!(state.end_date, Some(day(1)));
    }

    #[test]
    fn test_end_date_iff_approved() {
        let state = ApprovalState::pending();
        assert_eq!(state.approved, state.end_date.is_some());

        let mut approved = state;
        approved.approve(day(3));
        assert_eq!(approved.approved, approved.end_date.is_some());
    }

    #[test]
    fn test_new_entities_start_pending() {
        let manager = ActorId::new();
        let project = Project::new("Platform rebuild", manager.clone());
        let epic = Epic::new("Auth", project.id.clone(), manager);
        let story = Story::new("Login form", epic.id.clone(), project.id.clone());

        assert!(!project.is_complete());
        assert!(!epic.is_complete());
        assert!(!story.is_complete());
        assert!(!story.approval.approved);
    }

    #[test]
    fn test_story_serialization_flattens_approval() {
        let manager = ActorId::new();
        let project = Project::new("P", manager);
        let epic = Epic::new("E", project.id.clone(), project.manager.clone());
        let mut story = Story::new("S", epic.id.clone(), project.id.clone());
        story.approval.approve(day(2));

        let json = serde_json::to_value(&story).unwrap();
        assert_eq!(json["approved"], serde_json::json!(true));
        assert_eq!(json["end_date"], serde_json::json!("2025-06-02"));

        let parsed: Story = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, story);
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::Project.to_string(), "project");
        assert_eq!(EntityKind::SlaRule.to_string(), "sla rule");
    }
}

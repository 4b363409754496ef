//! The access-level policy rules.
//!
//! Rules apply in order; the first matching rule decides. Every function is
//! total: the answer is always `Allow` or `Deny(reason)`, never an error.

use greenlight_models::{Actor, EntityKind};

use crate::decision::{Decision, DenyReason};

/// An operation to authorize, carrying the pre-resolved actors it concerns.
///
/// Resolution (loading managers, creators, assignees) is the orchestrator's
/// job; the policy only compares what it is handed.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Create a project managed by `manager`.
    CreateProject { manager: &'a Actor },
    /// Create an epic managed by `manager`.
    CreateEpic { manager: &'a Actor },
    /// Create a story assigned to `assignee` (unassigned is always fine).
    CreateStory { assignee: Option<&'a Actor> },
    /// Create a client.
    CreateClient,
    /// Update an entity of the given kind (base access-level gate; the
    /// work-field and approval gates apply on top).
    Update { kind: EntityKind },
    /// Touch the work fields (deliverables, description, start/end flags)
    /// of an entity whose effective creator is `creator`.
    WorkOn {
        kind: EntityKind,
        creator: Option<&'a Actor>,
        approved: bool,
    },
    /// Modify a story beyond its approval flag; `manager` is the managing
    /// actor of the story's epic.
    ModifyStory { manager: Option<&'a Actor> },
    /// Mark a story completed.
    CompleteStory,
    /// Delete a project.
    DeleteProject,
    /// Delete a story.
    DeleteStory,
    /// Delete an epic under a project created by `project_creator`.
    DeleteEpic { project_creator: Option<&'a Actor> },
    /// Delete a client.
    DeleteClient,
    /// Create, update, or delete an SLA rule.
    MutateSlaRule,
    /// Read an entity of the given kind.
    View { kind: EntityKind },
    /// Perform a workflow operation on an epic under a project created by
    /// `creator`.
    WorkflowOnProject { creator: Option<&'a Actor> },
}

/// Decides whether `actor` may perform `operation`.
pub fn authorize(actor: &Actor, operation: &Operation<'_>) -> Decision {
    match operation {
        Operation::CreateProject { manager } => {
            create_managed(actor, manager, EntityKind::Project, "create projects")
        }
        Operation::CreateEpic { manager } => {
            create_managed(actor, manager, EntityKind::Epic, "create epics")
        }
        Operation::CreateStory { assignee } => create_story(actor, *assignee),
        Operation::CreateClient => require_level(actor, 4, "create clients").into(),
        Operation::Update { kind } => update(actor, *kind),
        Operation::WorkOn {
            kind,
            creator,
            approved,
        } => work_on(*kind, *creator, *approved),
        Operation::ModifyStory { manager } => modify_story(actor, *manager),
        Operation::CompleteStory => {
            require_level(actor, 2, "complete stories").into()
        }
        Operation::DeleteProject => require_level(actor, 4, "delete projects").into(),
        Operation::DeleteStory => require_level(actor, 4, "delete stories").into(),
        Operation::DeleteEpic { project_creator } => delete_epic(actor, *project_creator),
        Operation::DeleteClient => require_level(actor, 4, "delete clients").into(),
        Operation::MutateSlaRule => require_level(actor, 4, "manage SLA rules").into(),
        Operation::View { kind } => view(actor, *kind),
        Operation::WorkflowOnProject { creator } => workflow_on_project(actor, *creator),
    }
}

/// Create-Project / Create-Epic rule. Level 3 may only manage their own
/// entity, level 4 extends to direct reports, level 5 and above is unbounded.
fn create_managed(actor: &Actor, manager: &Actor, kind: EntityKind, action: &str) -> Decision {
    if let Err(reason) = require_level(actor, 3, action) {
        return Decision::Deny(reason);
    }
    match actor.access_level {
        3 if manager.id != actor.id => Decision::Deny(DenyReason::ManagerNotSelf(kind)),
        4 if manager.id != actor.id && !actor.is_direct_manager_of(manager) => {
            Decision::Deny(DenyReason::ManagerNotDirectReport(kind))
        }
        _ => Decision::Allow,
    }
}

/// Create-Story rule. Level 2 may only assign to themselves, level 3 extends
/// to direct reports, level 4 and above is unbounded.
fn create_story(actor: &Actor, assignee: Option<&Actor>) -> Decision {
    if let Err(reason) = require_level(actor, 2, "create stories") {
        return Decision::Deny(reason);
    }
    let Some(assignee) = assignee else {
        return Decision::Allow;
    };
    match actor.access_level {
        2 if assignee.id != actor.id => Decision::Deny(DenyReason::AssigneeNotSelf),
        3 if assignee.id != actor.id && !actor.is_direct_manager_of(assignee) => {
            Decision::Deny(DenyReason::AssigneeNotDirectReport)
        }
        _ => Decision::Allow,
    }
}

/// Base access-level floor for updates: projects, clients, and SLA rules
/// take a senior actor; epics and stories open at level 2.
fn update(actor: &Actor, kind: EntityKind) -> Decision {
    match kind {
        EntityKind::Project => require_level(actor, 4, "update projects").into(),
        EntityKind::Epic => require_level(actor, 2, "update epics").into(),
        EntityKind::Story => require_level(actor, 2, "update stories").into(),
        EntityKind::Client => require_level(actor, 4, "update clients").into(),
        EntityKind::SlaRule => require_level(actor, 4, "manage SLA rules").into(),
        EntityKind::Actor => require_level(actor, 5, "edit actors").into(),
    }
}

/// Work-field gate: unapproved entities cannot be worked on unless their
/// effective creator is senior. A missing creator (legacy rows) counts as
/// senior.
fn work_on(kind: EntityKind, creator: Option<&Actor>, approved: bool) -> Decision {
    if approved {
        return Decision::Allow;
    }
    let creator_is_senior = creator.map_or(true, Actor::is_senior);
    if creator_is_senior {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotApprovedForWork(kind))
    }
}

/// Non-approval story modifications are reserved to the managing actor and
/// senior actors.
fn modify_story(actor: &Actor, manager: Option<&Actor>) -> Decision {
    if manager.is_some_and(|m| m.id == actor.id) || actor.is_senior() {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotManagingActor)
    }
}

/// Epic deletion needs level 2 plus workflow permission on the owning project.
fn delete_epic(actor: &Actor, project_creator: Option<&Actor>) -> Decision {
    if let Err(reason) = require_level(actor, 2, "delete epics") {
        return Decision::Deny(reason);
    }
    workflow_on_project(actor, project_creator)
}

/// View rule: epics and stories need level 2; clients and projects only need
/// an authenticated actor.
fn view(actor: &Actor, kind: EntityKind) -> Decision {
    match kind {
        EntityKind::Epic | EntityKind::Story => {
            require_level(actor, 2, "view this resource").into()
        }
        _ => Decision::Allow,
    }
}

/// Project workflow permission: the project creator themselves, or any actor
/// at or above the creator's level. A project with no recorded creator is
/// open to seniors only.
fn workflow_on_project(actor: &Actor, creator: Option<&Actor>) -> Decision {
    let allowed = match creator {
        Some(creator) => creator.id == actor.id || actor.access_level >= creator.access_level,
        None => actor.is_senior(),
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NoProjectPermission)
    }
}

fn require_level(actor: &Actor, required: u8, action: &str) -> Result<(), DenyReason> {
    if actor.has_access_level(required) {
        Ok(())
    } else {
        Err(DenyReason::InsufficientAccessLevel {
            required,
            action: action.to_string(),
        })
    }
}

//! Policy decisions and typed denial reasons.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use greenlight_models::EntityKind;

/// Why an operation was refused.
///
/// The `Display` output of each variant is surfaced verbatim by the boundary
/// layer as a 400-class failure, so the wording here is part of the API.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum DenyReason {
    /// The actor's access level is below the floor for the operation.
    #[error("insufficient access level: you need access level {required} or higher to {action}")]
    InsufficientAccessLevel { required: u8, action: String },

    /// A level-3 actor tried to hand management of a new entity to someone else.
    #[error("managers with access level 3 can only create a {0} managed by themselves")]
    ManagerNotSelf(EntityKind),

    /// A level-4 actor tried to assign management outside their direct reports.
    #[error("senior managers can only create a {0} for themselves or their direct reports")]
    ManagerNotDirectReport(EntityKind),

    /// A level-2 actor tried to assign a new story to someone else.
    #[error("employees with access level 2 can only create stories assigned to themselves")]
    AssigneeNotSelf,

    /// A level-3 actor tried to assign a new story outside their direct reports.
    #[error("managers can only create stories for themselves or their direct reports")]
    AssigneeNotDirectReport,

    /// Work fields were touched before the approval gate opened.
    #[error("{0} cannot be worked on until approved by the creator's reporting manager")]
    NotApprovedForWork(EntityKind),

    /// The actor is neither the senior creator nor the creator's reporting manager.
    #[error("only the creator's reporting manager can approve this {0}")]
    NotApprovalAuthority(EntityKind),

    /// Story modifications are reserved to the managing actor and seniors.
    #[error("only the managing actor or a senior manager can modify this story")]
    NotManagingActor,

    /// The actor lacks workflow permission on the owning project.
    #[error("insufficient permission for workflow operation on this project")]
    NoProjectPermission,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    /// True if the operation may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Converts into a `Result` for use with `?`.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

impl From<Result<(), DenyReason>> for Decision {
    fn from(result: Result<(), DenyReason>) -> Self {
        match result {
            Ok(()) => Decision::Allow,
            Err(reason) => Decision::Deny(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_reason_messages_are_client_facing() {
        let reason = DenyReason::NotApprovedForWork(EntityKind::Story);
        assert_eq!(
            reason.to_string(),
            "story cannot be worked on until approved by the creator's reporting manager"
        );

        let reason = DenyReason::InsufficientAccessLevel {
            required: 3,
            action: "create projects".to_string(),
        };
        assert_eq!(
            reason.to_string(),
            "insufficient access level: you need access level 3 or higher to create projects"
        );
    }

    #[test]
    fn test_decision_into_result() {
        assert!(Decision::Allow.into_result().is_ok());

        let denied = Decision::Deny(DenyReason::AssigneeNotSelf);
        assert_eq!(denied.into_result(), Err(DenyReason::AssigneeNotSelf));
    }

    #[test]
    fn test_deny_reason_serializes_with_tag() {
        let reason = DenyReason::NotApprovalAuthority(EntityKind::Epic);
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["reason"], serde_json::json!("not_approval_authority"));
    }
}

//! Approval authority and the apply-approval mutation.
//!
//! The authority rule has the same shape for projects, epics, and stories:
//! a senior creator may approve their own work, otherwise only the
//! creator's reporting manager may. The orchestrator resolves the effective
//! creator (entity creator, falling back to the entity's manager for legacy
//! rows) before asking.

use chrono::NaiveDate;

use greenlight_models::{Actor, ApprovalState, EntityKind};
use greenlight_policy::{Decision, DenyReason};

/// Decides approval authority and applies approval state.
pub struct ApprovalWorkflow;

impl ApprovalWorkflow {
    /// Whether `actor` may approve an entity whose effective creator is
    /// `creator`.
    ///
    /// With no resolvable creator at all, only senior actors may approve.
    pub fn can_approve(actor: &Actor, creator: Option<&Actor>, kind: EntityKind) -> Decision {
        match creator {
            Some(creator) if creator.is_senior() && creator.id == actor.id => Decision::Allow,
            Some(creator) if creator.reports_to.as_ref() == Some(&actor.id) => Decision::Allow,
            Some(_) => Decision::Deny(DenyReason::NotApprovalAuthority(kind)),
            None if actor.is_senior() => Decision::Allow,
            None => Decision::Deny(DenyReason::NotApprovalAuthority(kind)),
        }
    }

    /// Applies approval as of `today`.
    ///
    /// Idempotent: approving an approved entity changes nothing, and the
    /// completion date is stamped at most once. This single mutation is what
    /// the cascade engine observes.
    ///
    /// # Returns
    ///
    /// `true` if the entity transitioned to `Completed` on this call.
    pub fn approve(state: &mut ApprovalState, today: NaiveDate) -> bool {
        state.approve(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, n).unwrap()
    }

    #[test]
    fn test_senior_creator_self_approves() {
        let creator = Actor::new("senior", 4);
        let decision =
            ApprovalWorkflow::can_approve(&creator, Some(&creator), EntityKind::Project);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_junior_creator_cannot_self_approve() {
        let creator = Actor::new("junior", 2);
        let decision = ApprovalWorkflow::can_approve(&creator, Some(&creator), EntityKind::Story);
        assert_eq!(
            decision,
            Decision::Deny(DenyReason::NotApprovalAuthority(EntityKind::Story))
        );
    }

    #[test]
    fn test_reporting_manager_approves() {
        let manager = Actor::new("manager", 3);
        let creator = Actor::new("junior", 2).reporting_to(&manager.id);

        let decision = ApprovalWorkflow::can_approve(&manager, Some(&creator), EntityKind::Story);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_unrelated_senior_cannot_approve() {
        let manager = Actor::new("manager", 3);
        let creator = Actor::new("junior", 2).reporting_to(&manager.id);
        let bystander = Actor::new("bystander", 5);

        let decision =
            ApprovalWorkflow::can_approve(&bystander, Some(&creator), EntityKind::Epic);
        assert_eq!(
            decision,
            Decision::Deny(DenyReason::NotApprovalAuthority(EntityKind::Epic))
        );
    }

    #[test]
    fn test_creatorless_entity_approved_by_senior_only() {
        let senior = Actor::new("senior", 4);
        let junior = Actor::new("junior", 3);

        assert!(ApprovalWorkflow::can_approve(&senior, None, EntityKind::Project).is_allowed());
        assert!(!ApprovalWorkflow::can_approve(&junior, None, EntityKind::Project).is_allowed());
    }

    #[test]
    fn test_approve_is_idempotent() {
        let mut state = ApprovalState::pending();

        assert!(ApprovalWorkflow::approve(&mut state, day(1)));
        assert!(!ApprovalWorkflow::approve(&mut state, day(2)));
        assert_eq!(state.end_date, Some(day(1)));
    }
}

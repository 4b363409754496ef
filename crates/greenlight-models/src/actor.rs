//! Actors and access levels.
//!
//! Greenlight flattens the admin/manager/employee user hierarchy into a
//! single [`Actor`] record carrying an integer access level, a [`Role`] tag,
//! and an optional role-specific payload. Approval authority flows through
//! the `reports_to` link, which is a weak id reference (lookup only, never
//! ownership).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Minimum access level at which an actor counts as senior.
pub const SENIOR_ACCESS_LEVEL: u8 = 4;

/// Role tag for an actor, derived from the access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access (level 5).
    Admin,
    /// Manages projects and epics (level 3-4).
    Manager,
    /// Works on assigned stories (level 2).
    Employee,
    /// Authenticated but otherwise unprivileged (level 1).
    #[default]
    User,
}

impl Role {
    /// Maps an access level onto its role tag.
    pub fn from_access_level(level: u8) -> Self {
        match level {
            5.. => Role::Admin,
            3 | 4 => Role::Manager,
            2 => Role::Employee,
            _ => Role::User,
        }
    }
}

/// Role-specific attributes, keyed by the actor's role tag.
///
/// Replaces the original subtype hierarchy: the variant carried here must
/// agree with [`Actor::role`], and absence is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role")]
pub enum RoleDetails {
    Admin {
        admin_level: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        access_scope: Option<String>,
    },
    Manager {
        #[serde(skip_serializing_if = "Option::is_none")]
        approval_limit: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        team_size: Option<u32>,
    },
    Employee {
        max_active_tasks: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        skill_set: Option<String>,
    },
}

/// An identity that can create, work on, approve, or delete entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier for the actor.
    pub id: ActorId,

    /// Login name, used in notification messages.
    pub username: String,

    /// Delivery address for notifications, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Integer rank, 1 (basic) through 5 (admin).
    pub access_level: u8,

    /// The actor this one reports to. Weak reference by id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<ActorId>,

    /// Role tag derived from the access level.
    pub role: Role,

    /// Role-specific variant payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<RoleDetails>,

    /// Job title, informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,

    /// Date the actor joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joining_date: Option<NaiveDate>,
}

impl Actor {
    /// Creates a new actor with the given username and access level.
    ///
    /// The role tag is derived from the access level.
    pub fn new(username: impl Into<String>, access_level: u8) -> Self {
        Self {
            id: ActorId::new(),
            username: username.into(),
            email: None,
            access_level,
            reports_to: None,
            role: Role::from_access_level(access_level),
            details: None,
            job_title: None,
            joining_date: None,
        }
    }

    /// Sets the reporting manager and returns the actor (builder style).
    pub fn reporting_to(mut self, manager: &ActorId) -> Self {
        self.reports_to = Some(manager.clone());
        self
    }

    /// Sets the notification email and returns the actor (builder style).
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// True if this actor's access level is at least `level`.
    pub fn has_access_level(&self, level: u8) -> bool {
        self.access_level >= level
    }

    /// True if this actor is senior (access level 4 or above).
    pub fn is_senior(&self) -> bool {
        self.access_level >= SENIOR_ACCESS_LEVEL
    }

    /// True if `other` reports directly to this actor (depth 1 only).
    pub fn is_direct_manager_of(&self, other: &Actor) -> bool {
        other.reports_to.as_ref() == Some(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_access_level() {
        assert_eq!(Role::from_access_level(1), Role::User);
        assert_eq!(Role::from_access_level(2), Role::Employee);
        assert_eq!(Role::from_access_level(3), Role::Manager);
        assert_eq!(Role::from_access_level(4), Role::Manager);
        assert_eq!(Role::from_access_level(5), Role::Admin);
        assert_eq!(Role::from_access_level(7), Role::Admin);
    }

    #[test]
    fn test_seniority_boundary() {
        assert!(!Actor::new("lead", 3).is_senior());
        assert!(Actor::new("senior", 4).is_senior());
        assert!(Actor::new("admin", 5).is_senior());
    }

    #[test]
    fn test_direct_manager_depth_one_only() {
        let top = Actor::new("top", 5);
        let mid = Actor::new("mid", 4).reporting_to(&top.id);
        let leaf = Actor::new("leaf", 2).reporting_to(&mid.id);

        assert!(top.is_direct_manager_of(&mid));
        assert!(mid.is_direct_manager_of(&leaf));
        // Grand-manager relationships do not count.
        assert!(!top.is_direct_manager_of(&leaf));
    }

    #[test]
    fn test_actor_serialization_roundtrip() {
        let actor = Actor {
            details: Some(RoleDetails::Manager {
                approval_limit: Some(10_000.0),
                team_size: Some(6),
            }),
            ..Actor::new("maria", 4).with_email("maria@example.com")
        };

        let json = serde_json::to_string(&actor).unwrap();
        let parsed: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, actor);
    }
}

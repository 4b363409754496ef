//! Identity seam: who is calling.
//!
//! Boundary layers that authenticate a session resolve the calling actor
//! through this trait; in-process callers usually pass the actor explicitly
//! to the service operations instead.

use greenlight_models::Actor;

use crate::error::{Result, WorkflowError};

/// Resolves the calling identity and its access level/reporting chain.
pub trait Identity: Send + Sync {
    /// The currently authenticated actor.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::Unauthenticated`] when no identity is established.
    fn current_actor(&self) -> Result<Actor>;
}

/// An identity fixed at construction time (tests, CLI sessions).
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    actor: Option<Actor>,
}

impl StaticIdentity {
    /// An identity that always resolves to `actor`.
    pub fn new(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }

    /// An identity with nobody signed in.
    pub fn anonymous() -> Self {
        Self { actor: None }
    }
}

impl Identity for StaticIdentity {
    fn current_actor(&self) -> Result<Actor> {
        self.actor.clone().ok_or(WorkflowError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity_resolves() {
        let actor = Actor::new("maria", 4);
        let identity = StaticIdentity::new(actor.clone());
        assert_eq!(identity.current_actor().unwrap().id, actor.id);
    }

    #[test]
    fn test_anonymous_identity_fails() {
        let identity = StaticIdentity::anonymous();
        assert!(matches!(
            identity.current_actor(),
            Err(WorkflowError::Unauthenticated)
        ));
    }
}

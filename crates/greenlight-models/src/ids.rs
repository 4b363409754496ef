//! Type-safe ID wrappers for Greenlight.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID newtypes with common functionality.
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new random ID.
            pub fn new() -> Self {
                Self(format!("{}-{}", $prefix, Uuid::new_v4()))
            }

            /// Creates an ID from an existing string (for deserialization/testing).
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ActorId, "actor");
define_id!(ClientId, "client");
define_id!(ProjectId, "proj");
define_id!(EpicId, "epic");
define_id!(StoryId, "story");
define_id!(SlaRuleId, "sla");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_prefix() {
        let id = ActorId::new();
        assert!(id.as_str().starts_with("actor-"));
    }

    #[test]
    fn test_story_id_prefix() {
        let id = StoryId::new();
        assert!(id.as_str().starts_with("story-"));
    }

    #[test]
    fn test_id_from_string() {
        let id = ProjectId::from_string("proj-custom-123");
        assert_eq!(id.as_str(), "proj-custom-123");
    }

    #[test]
    fn test_id_serialization() {
        let id = EpicId::from_string("epic-test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"epic-test\"");

        let parsed: EpicId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display() {
        let id = ClientId::from_string("client-123");
        assert_eq!(format!("{}", id), "client-123");
    }

    #[test]
    fn test_id_ordering_is_stable() {
        let a = StoryId::from_string("story-a");
        let b = StoryId::from_string("story-b");
        assert!(a < b);
    }
}

//! Identifier newtypes
//!
//! Every record the engine touches is keyed by an opaque string id owned by
//! the surrounding application. Wrapping them keeps an `IdeaId` from being
//! passed where an `EngagementId` is expected.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a person or unit in the competency registry
    ResourceId
);
string_id!(
    /// Identifier of a proposed initiative
    IdeaId
);
string_id!(
    /// Identifier of an opportunity/engagement
    EngagementId
);
string_id!(
    /// Identifier of a peer casting votes on ideas
    VoterId
);
string_id!(
    /// Identifier of anything the follow-up detector tracks (opportunity, contact)
    EntityId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_ordering() {
        let a = ResourceId::new("r-001");
        let b = ResourceId::from("r-002");

        assert_eq!(a.to_string(), "r-001");
        assert!(a < b);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = IdeaId::new("I1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"I1\"");

        let back: IdeaId = serde_json::from_str("\"I1\"").unwrap();
        assert_eq!(back, id);
    }
}

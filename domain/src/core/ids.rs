//! String-backed identifiers used across the pipeline.
//!
//! Every identifier is a transparent newtype so that a [`GapId`] can never be
//! passed where a [`SolutionId`] is expected, while still serializing as a
//! plain JSON string.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of one pipeline run; persisted checkpoints are keyed by it.
    RunId
);
string_id!(
    /// Identifier of a gap, unique within a run (`gap-1`, `gap-2`, ...).
    GapId
);
string_id!(
    /// Identifier of a problem; derived from its gap (`problem-gap-1`).
    ProblemId
);
string_id!(SolutionId);
string_id!(AgentId);
string_id!(
    /// Identifier of a node inside an agent execution graph.
    NodeId
);
string_id!(
    /// Canonical identifier of a tool in the tool catalog.
    ToolId
);

impl RunId {
    /// Generates a fresh random run id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl AgentId {
    /// Generates a fresh random agent id.
    pub fn generate() -> Self {
        Self(format!("agent-{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = GapId::new("gap-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gap-1\"");
        let back: GapId = serde_json::from_str("\"gap-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(RunId::generate(), RunId::generate());
        assert!(AgentId::generate().as_str().starts_with("agent-"));
    }
}

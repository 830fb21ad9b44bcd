//! Results of running an agent over a snapshot.

use crate::core::ids::{AgentId, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single item could not be carried to an action.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFailure {
    #[error("No outgoing edge of node {node} matched the item state")]
    NoMatchingTransition { node: String },

    #[error("Tool {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Graph references unknown node {node}")]
    UnknownNode { node: String },
}

/// Outcome for one sensed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_ref: String,
    /// Descriptor of the terminal action (`label:important`, `skip`).
    pub applied_action: Option<String>,
    pub succeeded: bool,
    #[serde(default)]
    pub error: Option<ExecutionFailure>,
    /// Nodes visited, entry first.
    #[serde(default)]
    pub path: Vec<NodeId>,
}

impl ItemOutcome {
    pub fn applied(item_ref: impl Into<String>, action: String, path: Vec<NodeId>) -> Self {
        Self {
            item_ref: item_ref.into(),
            applied_action: Some(action),
            succeeded: true,
            error: None,
            path,
        }
    }

    pub fn failed(item_ref: impl Into<String>, error: ExecutionFailure, path: Vec<NodeId>) -> Self {
        Self {
            item_ref: item_ref.into(),
            applied_action: None,
            succeeded: false,
            error: Some(error),
            path,
        }
    }

    /// True when the item went through a non-skip action.
    pub fn acted(&self) -> bool {
        self.succeeded && self.applied_action.as_deref().is_some_and(|a| a != "skip")
    }
}

/// Per-item outcomes in snapshot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub agent_id: AgentId,
    pub per_item: Vec<ItemOutcome>,
}

impl ExecutionResult {
    pub fn new(agent_id: AgentId, per_item: Vec<ItemOutcome>) -> Self {
        Self { agent_id, per_item }
    }

    pub fn outcome(&self, item_ref: &str) -> Option<&ItemOutcome> {
        self.per_item.iter().find(|o| o.item_ref == item_ref)
    }

    pub fn succeeded_count(&self) -> usize {
        self.per_item.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.per_item.len() - self.succeeded_count()
    }

    pub fn acted_count(&self) -> usize {
        self.per_item.iter().filter(|o| o.acted()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.per_item.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let result = ExecutionResult::new(
            AgentId::new("agent-1"),
            vec![
                ItemOutcome::applied("m1", "label:important".into(), vec![]),
                ItemOutcome::applied("m2", "skip".into(), vec![]),
                ItemOutcome::failed(
                    "m3",
                    ExecutionFailure::NoMatchingTransition {
                        node: "decide".into(),
                    },
                    vec![NodeId::new("analyze"), NodeId::new("decide")],
                ),
            ],
        );
        assert_eq!(result.succeeded_count(), 2);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.acted_count(), 1);
        assert_eq!(
            result.outcome("m3").unwrap().error.as_ref().unwrap().to_string(),
            "No outgoing edge of node decide matched the item state"
        );
    }

    #[test]
    fn test_failure_serializes_tagged() {
        let json = serde_json::to_value(ExecutionFailure::ToolFailed {
            tool: "classify".into(),
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "tool_failed");
    }
}

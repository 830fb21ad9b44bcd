//! Tool invocation value objects.

use crate::context::snapshot::SensedItem;
use crate::core::ids::ToolId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to run one tool against one sensed item.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: ToolId,
    pub item: SensedItem,
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool: ToolId, item: SensedItem) -> Self {
        Self {
            tool,
            item,
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// What a tool contributed; merged into the agent state by the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOutput {
    pub fields: Map<String, Value>,
    pub score: Option<f64>,
    pub label: Option<String>,
    /// Description of an external effect (`label:important`, `notify:digest`).
    pub effect: Option<String>,
}

impl ToolOutput {
    pub fn fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn score(score: f64) -> Self {
        Self {
            score: Some(score),
            ..Self::default()
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn effect(effect: impl Into<String>) -> Self {
        Self {
            effect: Some(effect.into()),
            ..Self::default()
        }
    }
}

//! Per-item agent state that edge conditions are evaluated against.

use crate::context::snapshot::SensedItem;
use crate::tool::call::ToolOutput;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub item_id: String,
    pub fields: Map<String, Value>,
    pub score: Option<f64>,
    pub label: Option<String>,
}

impl AgentState {
    /// Fresh state for `item`; payload fields are visible before any tool runs.
    pub fn for_item(item: &SensedItem) -> Self {
        Self {
            item_id: item.id.clone(),
            fields: item.fields(),
            score: None,
            label: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Folds a tool's output into the state; later values win.
    pub fn absorb(&mut self, output: &ToolOutput) {
        for (key, value) in &output.fields {
            self.fields.insert(key.clone(), value.clone());
        }
        if output.score.is_some() {
            self.score = output.score;
        }
        if output.label.is_some() {
            self.label = output.label.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absorb_merges_outputs() {
        let item = SensedItem::new("m1", json!({"subject": "hello"}));
        let mut state = AgentState::for_item(&item);
        assert_eq!(state.field("subject"), Some(&json!("hello")));

        state.absorb(&ToolOutput::score(0.8));
        state.absorb(&ToolOutput::label("important"));
        state.absorb(&ToolOutput::default());

        assert_eq!(state.score, Some(0.8));
        assert_eq!(state.label.as_deref(), Some("important"));
    }
}

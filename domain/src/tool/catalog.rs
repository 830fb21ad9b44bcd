//! Tool catalog: the fixed registry agents bind their tools against.

use crate::core::ids::ToolId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Canonical names of the builtin tools.
pub mod builtin {
    pub const READ_ITEM: &str = "read_item";
    pub const SCORE_PRIORITY: &str = "score_priority";
    pub const CLASSIFY: &str = "classify";
    pub const APPLY_LABEL: &str = "apply_label";
    pub const NOTIFY: &str = "notify";
}

/// What a tool does to the agent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Reads item data into the agent state.
    Sense,
    /// Derives a score or label.
    Analyze,
    /// Changes something outside the agent (labels, notifications).
    Act,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: ToolId,
    pub description: String,
    pub kind: ToolKind,
}

impl ToolDefinition {
    pub fn new(id: impl Into<ToolId>, description: impl Into<String>, kind: ToolKind) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind,
        }
    }
}

/// Registry of available tools plus aliases for the names models tend to use.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<ToolId, ToolDefinition>,
    aliases: HashMap<String, ToolId>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin tool set with its common aliases.
    pub fn builtin() -> Self {
        use builtin::*;
        Self::new()
            .register(ToolDefinition::new(
                READ_ITEM,
                "Read the fields of a sensed item",
                ToolKind::Sense,
            ))
            .register(ToolDefinition::new(
                SCORE_PRIORITY,
                "Score an item's priority between 0 and 1",
                ToolKind::Analyze,
            ))
            .register(ToolDefinition::new(
                CLASSIFY,
                "Assign a category label to an item",
                ToolKind::Analyze,
            ))
            .register(ToolDefinition::new(
                APPLY_LABEL,
                "Apply a label to an item",
                ToolKind::Act,
            ))
            .register(ToolDefinition::new(
                NOTIFY,
                "Send a notification about an item",
                ToolKind::Act,
            ))
            .alias("email_reader", READ_ITEM)
            .alias("reader", READ_ITEM)
            .alias("priority_scorer", SCORE_PRIORITY)
            .alias("scorer", SCORE_PRIORITY)
            .alias("classifier", CLASSIFY)
            .alias("label_applier", APPLY_LABEL)
            .alias("labeler", APPLY_LABEL)
            .alias("notification", NOTIFY)
            .alias("notifier", NOTIFY)
    }

    pub fn register(mut self, definition: ToolDefinition) -> Self {
        self.tools.insert(definition.id.clone(), definition);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<ToolId>) -> Self {
        self.aliases.insert(normalize(&alias.into()), target.into());
        self
    }

    /// Resolves a free-form tool name to a registered tool.
    ///
    /// Names are normalized (case, `-`, spaces) before lookup; aliases pointing
    /// at unregistered tools do not resolve.
    pub fn resolve(&self, name: &str) -> Option<ToolId> {
        let key = normalize(name);
        let id = self
            .aliases
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ToolId::new(key));
        self.tools.contains_key(&id).then_some(id)
    }

    pub fn contains(&self, id: &ToolId) -> bool {
        self.tools.contains_key(id)
    }

    pub fn get(&self, id: &ToolId) -> Option<&ToolDefinition> {
        self.tools.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ToolId> {
        self.tools.keys()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_canonical_and_aliases() {
        let catalog = ToolCatalog::builtin();
        assert_eq!(catalog.resolve("read_item").unwrap().as_str(), "read_item");
        assert_eq!(catalog.resolve("Read-Item").unwrap().as_str(), "read_item");
        assert_eq!(
            catalog.resolve("email_reader").unwrap().as_str(),
            "read_item"
        );
        assert_eq!(
            catalog.resolve("Priority Scorer").unwrap().as_str(),
            "score_priority"
        );
        assert!(catalog.resolve("sorter").is_none());
    }

    #[test]
    fn test_alias_to_missing_tool_does_not_resolve() {
        let catalog = ToolCatalog::new()
            .register(ToolDefinition::new("read_item", "r", ToolKind::Sense))
            .alias("labeler", "apply_label");
        assert!(catalog.resolve("labeler").is_none());
        assert_eq!(catalog.len(), 1);
    }
}

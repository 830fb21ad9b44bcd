//! Builtin tool executor, the concrete [`ToolExecutorPort`].

use super::heuristics;
use async_trait::async_trait;
use gapwise_application::{ToolError, ToolExecutorPort};
use gapwise_domain::tool::builtin;
use gapwise_domain::{ToolCall, ToolCatalog, ToolOutput};
use serde_json::Map;
use tracing::debug;

/// Runs the builtin tools against the item carried by each call.
///
/// Calls may name a tool by alias; the catalog resolves it first.
#[derive(Debug, Clone)]
pub struct BuiltinToolExecutor {
    catalog: ToolCatalog,
}

impl BuiltinToolExecutor {
    pub fn new() -> Self {
        Self {
            catalog: ToolCatalog::builtin(),
        }
    }

    /// Restricts the executor to `catalog`, e.g. to simulate a missing tool.
    pub fn with_catalog(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }

    fn read_item(call: &ToolCall) -> ToolOutput {
        let mut fields = call.item.fields();
        // Both spellings of the unread flag end up in the state
        if let Some(read) = call.item.bool_field("read") {
            fields.insert("unread".to_string(), (!read).into());
        }
        ToolOutput::fields(fields)
    }

    fn score_priority(call: &ToolCall) -> ToolOutput {
        let score = heuristics::priority_score(&call.item);
        let mut output = ToolOutput::score(score);
        output
            .fields
            .insert("priority_score".to_string(), score.into());
        output
    }

    /// Keyword topic, falling back to the `fallback_label` argument.
    fn classify(call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let label = heuristics::topic(&call.item)
            .or_else(|| call.arg_str("fallback_label"))
            .ok_or_else(|| {
                ToolError::InvalidInput(format!(
                    "no topic matched item {} and no fallback label was given",
                    call.item.id
                ))
            })?;
        let mut fields = Map::new();
        fields.insert("topic".to_string(), label.into());
        Ok(ToolOutput {
            fields,
            label: Some(label.to_string()),
            ..ToolOutput::default()
        })
    }

    fn apply_label(call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let label = call
            .arg_str("label")
            .filter(|label| !label.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidInput("apply_label needs a label".to_string()))?;
        Ok(ToolOutput::effect(format!("label:{}", label)))
    }

    fn notify(call: &ToolCall) -> ToolOutput {
        let channel = call.arg_str("channel").unwrap_or("digest");
        ToolOutput::effect(format!("notify:{}", channel))
    }
}

impl Default for BuiltinToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutorPort for BuiltinToolExecutor {
    fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    async fn invoke(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let tool = self
            .catalog
            .resolve(call.tool.as_str())
            .ok_or_else(|| ToolError::UnknownTool(call.tool.to_string()))?;

        debug!("{} on {}", tool, call.item.id);
        match tool.as_str() {
            builtin::READ_ITEM => Ok(Self::read_item(call)),
            builtin::SCORE_PRIORITY => Ok(Self::score_priority(call)),
            builtin::CLASSIFY => Self::classify(call),
            builtin::APPLY_LABEL => Self::apply_label(call),
            builtin::NOTIFY => Ok(Self::notify(call)),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapwise_domain::{SensedItem, ToolDefinition, ToolId, ToolKind};
    use serde_json::json;

    fn call(tool: &str, payload: serde_json::Value) -> ToolCall {
        ToolCall::new(ToolId::new(tool), SensedItem::new("m1", payload))
    }

    #[tokio::test]
    async fn test_read_and_score() {
        let executor = BuiltinToolExecutor::new();
        let output = executor
            .invoke(&call("reader", json!({"subject": "hi", "read": false})))
            .await
            .unwrap();
        assert_eq!(output.fields.get("unread"), Some(&json!(true)));

        let output = executor
            .invoke(&call("score_priority", json!({"priority": "high"})))
            .await
            .unwrap();
        assert_eq!(output.score, Some(0.9));
    }

    #[tokio::test]
    async fn test_classify_uses_fallback() {
        let executor = BuiltinToolExecutor::new();
        let output = executor
            .invoke(&call("classifier", json!({"subject": "payment received"})))
            .await
            .unwrap();
        assert_eq!(output.label.as_deref(), Some("finance"));

        let output = executor
            .invoke(&call("classify", json!({"subject": "hello"})).with_arg("fallback_label", "normal"))
            .await
            .unwrap();
        assert_eq!(output.label.as_deref(), Some("normal"));

        let err = executor
            .invoke(&call("classify", json!({"subject": "hello"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_actions_report_effects() {
        let executor = BuiltinToolExecutor::new();
        let output = executor
            .invoke(&call("labeler", json!({})).with_arg("label", "important"))
            .await
            .unwrap();
        assert_eq!(output.effect.as_deref(), Some("label:important"));

        let output = executor
            .invoke(&call("notify", json!({})).with_arg("channel", "mobile"))
            .await
            .unwrap();
        assert_eq!(output.effect.as_deref(), Some("notify:mobile"));

        assert!(executor.invoke(&call("apply_label", json!({}))).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let executor = BuiltinToolExecutor::with_catalog(ToolCatalog::new().register(
            ToolDefinition::new(builtin::READ_ITEM, "read", ToolKind::Sense),
        ));
        let err = executor
            .invoke(&call("score_priority", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("score_priority".to_string()));
    }
}

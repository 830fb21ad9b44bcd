//! Structured inference requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output shape a stage expects back from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSchema {
    Expectation,
    Gaps,
    ProblemAnalysis,
    Solutions,
    AgentParameters,
}

impl OutputSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSchema::Expectation => "expectation",
            OutputSchema::Gaps => "gaps",
            OutputSchema::ProblemAnalysis => "problem_analysis",
            OutputSchema::Solutions => "solutions",
            OutputSchema::AgentParameters => "agent_parameters",
        }
    }

    /// Example of the expected JSON, embedded in the user message.
    pub fn shape_hint(&self) -> &'static str {
        match self {
            OutputSchema::Expectation => {
                r#"{"ideal_description": "...", "criteria": [{"domain": "inbox", "condition": "unread_count", "target_value": 5, "comparison": "at_most"}]}"#
            }
            OutputSchema::Gaps => {
                r#"[{"description": "...", "severity": "high|medium|low", "related_items": ["item-id"], "domain": "inbox", "condition": "unread_count"}]"#
            }
            OutputSchema::ProblemAnalysis => {
                r#"{"name": "...", "detail": "...", "cause": "...", "impact": "..."}"#
            }
            OutputSchema::Solutions => {
                r#"[{"name": "...", "description": "...", "pros": ["..."], "cons": ["..."], "complexity": "low|medium|high", "required_tools": ["..."], "category": "prioritization|classification|reminder|..."}]"#
            }
            OutputSchema::AgentParameters => {
                r#"{"threshold": 0.5, "label": "important", "fallback_label": "normal", "notify_channel": "digest"}"#
            }
        }
    }
}

impl std::fmt::Display for OutputSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call to the inference gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub system_instruction: String,
    pub schema: OutputSchema,
    pub payload: Value,
    /// Set on the retry after a malformed response.
    #[serde(default)]
    pub strict: bool,
}

impl InferenceRequest {
    pub fn new(system_instruction: impl Into<String>, schema: OutputSchema, payload: Value) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            schema,
            payload,
            strict: false,
        }
    }

    /// The same request with the stricter output instruction.
    pub fn stricter(&self) -> Self {
        Self {
            strict: true,
            ..self.clone()
        }
    }

    /// Text sent as the user turn: the payload plus the output contract.
    pub fn render_user_message(&self) -> String {
        let payload =
            serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| self.payload.to_string());
        let mut message = format!(
            "Input:\n{}\n\nRespond with JSON of this shape ({}):\n{}",
            payload,
            self.schema,
            self.schema.shape_hint()
        );
        if self.strict {
            message.push_str(
                "\n\nYour previous answer could not be parsed. Return ONLY valid JSON: no prose, no markdown.",
            );
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stricter_keeps_payload() {
        let request = InferenceRequest::new("sys", OutputSchema::Gaps, json!({"a": 1}));
        let strict = request.stricter();
        assert!(strict.strict);
        assert_eq!(strict.payload, request.payload);
        assert!(!request.render_user_message().contains("ONLY valid JSON"));
        assert!(strict.render_user_message().contains("ONLY valid JSON"));
        assert!(strict.render_user_message().contains("\"a\": 1"));
    }
}

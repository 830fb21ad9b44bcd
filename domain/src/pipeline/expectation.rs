//! Expectation: what "ideal" looks like for the current snapshot.

use crate::world::entities::Comparison;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured criterion of an [`Expectation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub domain: String,
    #[serde(default, alias = "criterion", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub target_value: Value,
    #[serde(default)]
    pub comparison: Comparison,
}

impl Criterion {
    pub fn new(domain: impl Into<String>, condition: impl Into<String>, target_value: Value) -> Self {
        Self {
            domain: domain.into(),
            condition: Some(condition.into()),
            target_value,
            comparison: Comparison::AtMost,
        }
    }

    /// Target as a number, accepting numeric strings.
    pub fn target_number(&self) -> Option<f64> {
        match &self.target_value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub ideal_description: String,
    pub criteria: Vec<Criterion>,
}

impl Expectation {
    pub fn criterion(&self, domain: &str, condition: &str) -> Option<&Criterion> {
        self.criteria
            .iter()
            .find(|c| c.domain == domain && c.condition.as_deref() == Some(condition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_number_accepts_strings() {
        let numeric = Criterion::new("inbox", "unread_count", json!(5));
        let text = Criterion::new("inbox", "unread_count", json!(" 5 "));
        let other = Criterion::new("inbox", "tone", json!("calm"));
        assert_eq!(numeric.target_number(), Some(5.0));
        assert_eq!(text.target_number(), Some(5.0));
        assert_eq!(other.target_number(), None);
    }

    #[test]
    fn test_criterion_alias() {
        let c: Criterion = serde_json::from_value(json!({
            "domain": "inbox", "criterion": "unread_count", "target_value": 5
        }))
        .unwrap();
        assert_eq!(c.condition.as_deref(), Some("unread_count"));
    }
}

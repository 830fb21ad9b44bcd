//! Lenient parsing of model output into pipeline value objects.
//!
//! Models wrap JSON in prose or code fences, return a single object where a
//! list was asked for, and drift in field names. Everything here accepts that
//! noise and reports a [`ParseError`] only when nothing usable remains.

use crate::agent::template::ParameterOverrides;
use crate::core::ids::{GapId, SolutionId};
use crate::pipeline::expectation::{Criterion, Expectation};
use crate::pipeline::gap::{Gap, Severity};
use crate::pipeline::problem::ProblemAnalysis;
use crate::pipeline::solution::{Complexity, Solution};
use crate::world::entities::Comparison;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No JSON found in response")]
    NoJson,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unexpected shape: {0}")]
    Shape(String),
}

/// Extracts the JSON document from a model response.
///
/// Tries, in order: a fenced ```` ```json ```` block, the whole trimmed text,
/// and the slice between the first opening and last closing bracket.
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```")
            && let Ok(value) = serde_json::from_str(body[..end].trim())
        {
            return Ok(value);
        }
    }

    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find(['{', '[']).ok_or(ParseError::NoJson)?;
    let close = if trimmed[start..].starts_with('{') { '}' } else { ']' };
    let end = trimmed.rfind(close).ok_or(ParseError::NoJson)?;
    if end <= start {
        return Err(ParseError::NoJson);
    }
    serde_json::from_str(&trimmed[start..=end]).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Unwraps `{"<key>": [...]}` envelopes and promotes a lone object to a list.
fn into_list(value: Value, key: &str) -> Result<Vec<Value>, ParseError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Ok(vec![other]),
            None => Ok(vec![Value::Object(map)]),
        },
        other => Err(ParseError::Shape(format!("expected list, got {}", kind(&other)))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A list of strings, also accepting a single string.
fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(text_of).collect(),
        Some(other) => text_of(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| value.get(*name))
}

fn str_field(value: &Value, names: &[&str]) -> Option<String> {
    field(value, names).and_then(text_of)
}

// ==================== Expectation ====================

#[derive(Deserialize)]
struct RawExpectation {
    #[serde(default, alias = "description")]
    ideal_description: Option<String>,
    #[serde(default, alias = "ideal_states")]
    criteria: Vec<Value>,
}

/// Parses an expectation. Criteria without a domain or target are dropped;
/// an expectation with no usable criteria is malformed.
pub fn parse_expectation(text: &str) -> Result<Expectation, ParseError> {
    let raw: RawExpectation = serde_json::from_value(extract_json(text)?)
        .map_err(|e| ParseError::Shape(e.to_string()))?;

    let criteria: Vec<Criterion> = raw
        .criteria
        .iter()
        .filter_map(|c| {
            let domain = str_field(c, &["domain"])?;
            let target_value = field(c, &["target_value", "target", "threshold"])?.clone();
            if target_value.is_null() {
                return None;
            }
            let comparison = match str_field(c, &["comparison"]).as_deref() {
                Some("at_least") | Some(">=") => Comparison::AtLeast,
                _ => Comparison::AtMost,
            };
            Some(Criterion {
                domain,
                condition: str_field(c, &["condition", "criterion"]),
                target_value,
                comparison,
            })
        })
        .collect();

    if criteria.is_empty() {
        return Err(ParseError::Shape("expectation has no usable criteria".into()));
    }

    let ideal_description = raw
        .ideal_description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| {
            raw.criteria
                .iter()
                .filter_map(|c| str_field(c, &["description"]))
                .collect::<Vec<_>>()
                .join("; ")
        });

    Ok(Expectation {
        ideal_description,
        criteria,
    })
}

// ==================== Gaps ====================

/// Parses gaps and assigns `gap-1..n` in detection order.
///
/// A single object is accepted as a one-element list; entries without a
/// description are dropped. An empty list is valid and means "no gaps", but a
/// non-empty list with no usable entry is malformed.
pub fn parse_gaps(text: &str) -> Result<Vec<Gap>, ParseError> {
    let entries = into_list(extract_json(text)?, "gaps")?;
    let gaps: Vec<Gap> = entries
        .iter()
        .filter_map(|entry| {
            let description = str_field(entry, &["description", "summary"])?;
            let severity = str_field(entry, &["severity"])
                .map(|s| Severity::parse_lenient(&s))
                .unwrap_or(Severity::Medium);
            let related = strings(field(entry, &["related_items", "affected_items"]));
            Some((description, severity, related, entry))
        })
        .enumerate()
        .map(|(i, (description, severity, related, entry))| {
            let mut gap = Gap::new(GapId::new(format!("gap-{}", i + 1)), description, severity)
                .with_related_items(related);
            if let Some(domain) = str_field(entry, &["domain"]) {
                gap = gap.with_target(domain, str_field(entry, &["condition", "criterion"]));
            }
            gap
        })
        .collect();
    if gaps.is_empty() && !entries.is_empty() {
        return Err(ParseError::Shape(format!(
            "{} gap entries, none with a description",
            entries.len()
        )));
    }
    Ok(gaps)
}

// ==================== Problem analysis ====================

pub fn parse_problem_analysis(text: &str) -> Result<ProblemAnalysis, ParseError> {
    let value = extract_json(text)?;
    let value = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    if !value.is_object() {
        return Err(ParseError::Shape(format!(
            "expected object, got {}",
            kind(&value)
        )));
    }
    Ok(ProblemAnalysis {
        name: str_field(&value, &["name", "problem", "title"]).unwrap_or_default(),
        detail: str_field(&value, &["detail", "description"]).unwrap_or_default(),
        cause: str_field(&value, &["cause", "root_cause"]).unwrap_or_default(),
        impact: str_field(&value, &["impact", "impact_if_unresolved"]).unwrap_or_default(),
    })
}

// ==================== Solutions ====================

/// Parsed solutions plus how many entries were discarded as invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSolutions {
    pub solutions: Vec<Solution>,
    pub dropped: usize,
}

/// Parses solutions, assigning ids `<id_prefix>-1..n` to valid entries.
///
/// Entries missing a name or description are dropped.
pub fn parse_solutions(text: &str, id_prefix: &str) -> Result<ParsedSolutions, ParseError> {
    let entries = into_list(extract_json(text)?, "solutions")?;
    let total = entries.len();
    let solutions: Vec<Solution> = entries
        .iter()
        .filter_map(|entry| {
            let name = str_field(entry, &["name", "title"])?;
            let description = str_field(entry, &["description", "summary"])?;
            Some((name, description, entry))
        })
        .enumerate()
        .map(|(i, (name, description, entry))| {
            let mut solution = Solution::new(
                SolutionId::new(format!("{}-{}", id_prefix, i + 1)),
                name,
                description,
            )
            .with_tools(strings(field(
                entry,
                &["required_tools", "tools", "required_mcp_tools"],
            )));
            solution.pros = strings(field(entry, &["pros"]));
            solution.cons = strings(field(entry, &["cons"]));
            if let Some(complexity) = str_field(entry, &["complexity"]) {
                solution = solution.with_complexity(Complexity::parse_lenient(&complexity));
            }
            if let Some(category) = str_field(entry, &["category", "archetype", "type"]) {
                solution = solution.with_category(category);
            }
            solution
        })
        .collect();

    Ok(ParsedSolutions {
        dropped: total - solutions.len(),
        solutions,
    })
}

// ==================== Agent parameters ====================

/// Parses parameter overrides. Numeric strings are accepted for the threshold.
pub fn parse_parameters(text: &str) -> Result<ParameterOverrides, ParseError> {
    let value = extract_json(text)?;
    if !value.is_object() {
        return Err(ParseError::Shape(format!(
            "expected object, got {}",
            kind(&value)
        )));
    }
    let threshold = field(&value, &["threshold", "priority_threshold", "score_threshold"])
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
            _ => None,
        });
    Ok(ParameterOverrides {
        threshold,
        label: str_field(&value, &["label", "target_label"]),
        fallback_label: str_field(&value, &["fallback_label"]),
        notify_channel: str_field(&value, &["notify_channel", "channel"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            extract_json("Sure!\n```json\n[1, 2]\n```\nDone.").unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            extract_json(r#"Here you go: {"a": {"b": 2}} hope it helps"#).unwrap(),
            json!({"a": {"b": 2}})
        );
        assert_eq!(extract_json("no json at all"), Err(ParseError::NoJson));
        assert!(matches!(
            extract_json("{ broken"),
            Err(ParseError::NoJson) | Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_expectation() {
        let expectation = parse_expectation(
            r#"{"ideal_description": "Inbox under control", "criteria": [
                {"domain": "inbox", "condition": "unread_count", "target_value": 5},
                {"domain": "inbox"},
                {"condition": "orphan", "target_value": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(expectation.criteria.len(), 1);
        assert_eq!(expectation.ideal_description, "Inbox under control");
    }

    #[test]
    fn test_parse_expectation_accepts_ideal_states() {
        let expectation = parse_expectation(
            r#"{"ideal_states": [{"domain": "email", "description": "Important mail visible",
                "criterion": "unread_count", "target_value": "5"}]}"#,
        )
        .unwrap();
        assert_eq!(expectation.ideal_description, "Important mail visible");
        assert_eq!(
            expectation.criteria[0].condition.as_deref(),
            Some("unread_count")
        );
    }

    #[test]
    fn test_parse_expectation_without_criteria_is_malformed() {
        assert!(matches!(
            parse_expectation(r#"{"ideal_description": "x", "criteria": []}"#),
            Err(ParseError::Shape(_))
        ));
    }

    #[test]
    fn test_parse_gaps_single_object_and_ids() {
        let gaps = parse_gaps(
            r#"{"description": "unread exceeds ideal by 3", "severity": "HIGH",
                "affected_items": ["m1", "m2", "m1"], "domain": "inbox", "condition": "unread_count"}"#,
        )
        .unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].id.as_str(), "gap-1");
        assert_eq!(gaps[0].severity, Severity::High);
        assert_eq!(gaps[0].related_items, vec!["m1", "m2"]);
        assert_eq!(gaps[0].condition.as_deref(), Some("unread_count"));

        let gaps = parse_gaps(r#"[{"severity": "low"}, {"description": "b"}, {"description": "c"}]"#)
            .unwrap();
        let ids: Vec<&str> = gaps.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["gap-1", "gap-2"]);
    }

    #[test]
    fn test_parse_gaps_without_any_description_is_malformed() {
        let err = parse_gaps(r#"[{"issue": "unread exceeds ideal by 3", "severity": "high"}]"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::Shape(_)));
        assert!(parse_gaps("[]").unwrap().is_empty());
        assert!(parse_gaps(r#"{"gaps": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_problem_analysis() {
        let analysis = parse_problem_analysis(
            r#"{"name": "inbox overload", "description": "too much mail", "cause": "newsletters"}"#,
        )
        .unwrap();
        assert_eq!(analysis.name, "inbox overload");
        assert_eq!(analysis.detail, "too much mail");
        assert!(analysis.impact.is_empty());
        assert!(parse_problem_analysis(r#""just text""#).is_err());
    }

    #[test]
    fn test_parse_solutions_drops_invalid() {
        let parsed = parse_solutions(
            r#"{"solutions": [
                {"name": "Priority filter", "description": "Score and label", "pros": "fast",
                 "required_tools": ["email_reader"], "complexity": "low"},
                {"name": "No description"},
                {"name": "Digest", "description": "Daily digest", "category": "reminder"}
            ]}"#,
            "problem-gap-1-r1",
        )
        .unwrap();
        assert_eq!(parsed.dropped, 1);
        assert_eq!(parsed.solutions.len(), 2);
        assert_eq!(parsed.solutions[0].id.as_str(), "problem-gap-1-r1-1");
        assert_eq!(parsed.solutions[0].pros, vec!["fast"]);
        assert_eq!(parsed.solutions[0].complexity, Complexity::Low);
        assert_eq!(parsed.solutions[1].category.as_deref(), Some("reminder"));
    }

    #[test]
    fn test_parse_parameters() {
        let overrides =
            parse_parameters(r#"{"threshold": "0.7", "label": "urgent", "channel": "sms"}"#).unwrap();
        assert_eq!(overrides.threshold, Some(0.7));
        assert_eq!(overrides.label.as_deref(), Some("urgent"));
        assert_eq!(overrides.notify_channel.as_deref(), Some("sms"));
        assert_eq!(overrides.fallback_label, None);
        assert!(parse_parameters("[1]").is_err());
    }
}

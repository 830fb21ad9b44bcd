//! Observed metrics over sensed items.
//!
//! Ideal states name a `condition` such as `unread_count`; this module knows
//! how to measure the conditions that can be computed directly from item
//! payloads. Unknown conditions yield `None` and are left to inference.

use super::snapshot::SensedItem;
use crate::pipeline::expectation::Criterion;
use crate::world::entities::Comparison;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Whether an item counts as unread: `read: false`, `unread: true`, or no read flag at all.
pub fn is_unread(item: &SensedItem) -> bool {
    match (item.bool_field("read"), item.bool_field("unread")) {
        (Some(read), _) => !read,
        (None, Some(unread)) => unread,
        (None, None) => true,
    }
}

/// Measures `condition` over `items`.
///
/// Supported conditions:
/// - `item_count` / `total_count`: number of items
/// - `unread_count`: see [`is_unread`]
/// - `<field>_count`: items whose `field` is truthy (e.g. `flagged_count`)
pub fn observe(condition: &str, items: &[SensedItem]) -> Option<f64> {
    let count = match condition {
        "item_count" | "total_count" => items.len(),
        "unread_count" => items.iter().filter(|i| is_unread(i)).count(),
        other => {
            let field = other.strip_suffix("_count")?;
            if field.is_empty() {
                return None;
            }
            items
                .iter()
                .filter(|i| i.field(field).is_some_and(is_truthy))
                .count()
        }
    };
    Some(count as f64)
}

/// Items contributing to `condition`, in input order.
pub fn contributing_items<'a>(condition: &str, items: &'a [SensedItem]) -> Vec<&'a SensedItem> {
    match condition {
        "item_count" | "total_count" => items.iter().collect(),
        "unread_count" => items.iter().filter(|i| is_unread(i)).collect(),
        other => match other.strip_suffix("_count") {
            Some(field) if !field.is_empty() => items
                .iter()
                .filter(|i| i.field(field).is_some_and(is_truthy))
                .collect(),
            _ => Vec::new(),
        },
    }
}

/// A measurable criterion evaluated against the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub domain: String,
    pub condition: String,
    pub observed: f64,
    pub target: f64,
    pub comparison: Comparison,
    /// How far `observed` violates `target`; 0 when satisfied.
    pub excess: f64,
    pub related_items: Vec<String>,
}

/// Evaluates every criterion with a numeric target and a measurable condition.
pub fn observe_criteria(criteria: &[Criterion], items: &[SensedItem]) -> Vec<Observation> {
    criteria
        .iter()
        .filter_map(|criterion| {
            let condition = criterion.condition.as_deref()?;
            let target = criterion.target_number()?;
            let observed = observe(condition, items)?;
            Some(Observation {
                domain: criterion.domain.clone(),
                condition: condition.to_string(),
                observed,
                target,
                comparison: criterion.comparison,
                excess: criterion.comparison.excess(observed, target),
                related_items: contributing_items(condition, items)
                    .iter()
                    .map(|i| i.id.clone())
                    .collect(),
            })
        })
        .collect()
}

//! Gaps between sensed reality and the expectation.

use crate::core::ids::GapId;
use serde::{Deserialize, Serialize};

/// Gap severity. Ordering: `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Lenient parse for model output; unrecognized labels map to `Medium`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" | "severe" | "urgent" => Severity::High,
            "low" | "minor" | "trivial" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    /// Severity for a relative excess over a threshold.
    ///
    /// `>= 50%` is high, `>= 20%` medium, anything else low.
    pub fn from_excess_ratio(ratio: f64) -> Self {
        if ratio >= 0.5 {
            Severity::High
        } else if ratio >= 0.2 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub id: GapId,
    pub description: String,
    pub severity: Severity,
    /// Identifiers of sensed items involved, deduplicated in first-seen order.
    #[serde(default)]
    pub related_items: Vec<String>,
    /// Ideal-state domain this gap violates, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Gap {
    pub fn new(id: impl Into<GapId>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            severity,
            related_items: Vec::new(),
            domain: None,
            condition: None,
        }
    }

    pub fn with_related_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in items {
            let item = item.into();
            if !self.related_items.contains(&item) {
                self.related_items.push(item);
            }
        }
        self
    }

    pub fn with_target(mut self, domain: impl Into<String>, condition: Option<String>) -> Self {
        self.domain = Some(domain.into());
        self.condition = condition;
        self
    }
}

/// Sorts gaps by severity descending; ties keep detection order.
pub fn rank_gaps(gaps: &mut [Gap]) {
    // `sort_by` is stable
    gaps.sort_by(|a, b| b.severity.cmp(&a.severity));
}

//! World model entities.
//!
//! The [`WorldModel`] is the single source of truth read by every pipeline
//! stage. Its collections are private so the invariants hold no matter who
//! holds a mutable reference:
//!
//! - at most one [`IdealState`] per `(domain, condition)` pair
//! - goals keep insertion order (used as priority tie-break)
//! - learning only ever adds or adjusts; nothing here removes goals or preferences

use super::pattern::{PatternEntry, PatternKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub role: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }
}

/// Priority of a user goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl GoalPriority {
    /// Sort rank; lower ranks come first.
    pub fn rank(&self) -> u8 {
        match self {
            GoalPriority::High => 0,
            GoalPriority::Medium => 1,
            GoalPriority::Low => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub text: String,
    #[serde(default)]
    pub priority: GoalPriority,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(text: impl Into<String>, priority: GoalPriority, created_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            priority,
            created_at,
        }
    }
}

/// Direction in which an ideal-state threshold bounds the observed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Observed value should stay at or below the threshold (e.g. unread count).
    #[default]
    AtMost,
    /// Observed value should stay at or above the threshold (e.g. focus hours).
    AtLeast,
}

impl Comparison {
    /// Amount by which `observed` violates `threshold` (0 when satisfied).
    pub fn excess(&self, observed: f64, threshold: f64) -> f64 {
        match self {
            Comparison::AtMost => (observed - threshold).max(0.0),
            Comparison::AtLeast => (threshold - observed).max(0.0),
        }
    }

    pub fn is_satisfied(&self, observed: f64, threshold: f64) -> bool {
        self.excess(observed, threshold) == 0.0
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::AtMost => "at_most",
            Comparison::AtLeast => "at_least",
        }
    }
}

/// A declared ideal: `condition` in `domain` should respect `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealState {
    pub domain: String,
    pub condition: String,
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IdealState {
    pub fn new(domain: impl Into<String>, condition: impl Into<String>, threshold: f64) -> Self {
        Self {
            domain: domain.into(),
            condition: condition.into(),
            threshold,
            comparison: Comparison::AtMost,
            description: None,
        }
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn same_key(&self, other: &IdealState) -> bool {
        self.domain == other.domain && self.condition == other.condition
    }

    /// Whether this state belongs to `domain` and, when given, `condition`.
    pub fn matches(&self, domain: &str, condition: Option<&str>) -> bool {
        self.domain == domain && condition.is_none_or(|c| self.condition == c)
    }
}

fn dedupe_ideal_states<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<IdealState>, D::Error> {
    let raw = Vec::<IdealState>::deserialize(deserializer)?;
    let mut states: Vec<IdealState> = Vec::with_capacity(raw.len());
    for state in raw {
        match states.iter_mut().find(|s| s.same_key(&state)) {
            Some(existing) => *existing = state,
            None => states.push(state),
        }
    }
    Ok(states)
}

/// The user's persistent world model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldModel {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    goals: Vec<Goal>,
    #[serde(default)]
    preferences: BTreeMap<String, Value>,
    #[serde(default)]
    patterns: BTreeMap<PatternKey, PatternEntry>,
    #[serde(default, deserialize_with = "dedupe_ideal_states")]
    ideal_states: Vec<IdealState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl WorldModel {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    // ==================== Goals ====================

    pub fn add_goal(&mut self, goal: Goal) {
        self.goals.push(goal);
    }

    /// Goals in insertion order.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Goals ordered by priority; equal priorities keep insertion order.
    pub fn goals_by_priority(&self) -> Vec<&Goal> {
        let mut goals: Vec<&Goal> = self.goals.iter().collect();
        goals.sort_by_key(|g| g.priority.rank());
        goals
    }

    // ==================== Preferences ====================

    pub fn set_preference(&mut self, key: impl Into<String>, value: Value) {
        self.preferences.insert(key.into(), value);
    }

    pub fn preference(&self, key: &str) -> Option<&Value> {
        self.preferences.get(key)
    }

    pub fn preferences(&self) -> &BTreeMap<String, Value> {
        &self.preferences
    }

    // ==================== Ideal States ====================

    /// Inserts or replaces the ideal state for its `(domain, condition)`.
    ///
    /// Returns the replaced state, if any.
    pub fn upsert_ideal_state(&mut self, state: IdealState) -> Option<IdealState> {
        match self.ideal_states.iter_mut().find(|s| s.same_key(&state)) {
            Some(existing) => Some(std::mem::replace(existing, state)),
            None => {
                self.ideal_states.push(state);
                None
            }
        }
    }

    pub fn ideal_state(&self, domain: &str, condition: &str) -> Option<&IdealState> {
        self.ideal_states
            .iter()
            .find(|s| s.domain == domain && s.condition == condition)
    }

    pub fn ideal_states(&self) -> &[IdealState] {
        &self.ideal_states
    }

    /// Sets a new threshold on an existing ideal state, returning the old value.
    ///
    /// Unknown `(domain, condition)` pairs are left alone: recalibration never
    /// invents ideals the user did not declare.
    pub fn adjust_threshold(&mut self, domain: &str, condition: &str, threshold: f64) -> Option<f64> {
        let state = self
            .ideal_states
            .iter_mut()
            .find(|s| s.domain == domain && s.condition == condition)?;
        Some(std::mem::replace(&mut state.threshold, threshold))
    }

    // ==================== Patterns ====================

    pub fn patterns(&self) -> &BTreeMap<PatternKey, PatternEntry> {
        &self.patterns
    }

    pub fn pattern(&self, key: &PatternKey) -> Option<&PatternEntry> {
        self.patterns.get(key)
    }

    /// Merges `entry` into the pattern stored under `key`.
    pub fn merge_pattern(&mut self, key: PatternKey, entry: &PatternEntry) {
        self.patterns.entry(key).or_default().merge(entry);
    }

    // ==================== Bookkeeping ====================

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

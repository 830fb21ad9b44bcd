//! Sensed items and the immutable per-run context snapshot.

use crate::world::pattern::{PatternKey, weekday_name};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One opaque record from the sensed-data source (an email, a calendar entry, ...).
///
/// Only `id` is interpreted by the core; the payload is passed through to
/// inference and tools untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensedItem {
    pub id: String,
    #[serde(default)]
    pub payload: Value,
}

impl SensedItem {
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }

    /// Payload fields as a map (empty for non-object payloads).
    pub fn fields(&self) -> Map<String, Value> {
        self.payload.as_object().cloned().unwrap_or_default()
    }

    /// When the item arrived, from `received_at` or `timestamp` (RFC 3339).
    pub fn received_at(&self) -> Option<DateTime<FixedOffset>> {
        ["received_at", "timestamp"]
            .iter()
            .filter_map(|key| self.str_field(key))
            .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }
}

/// Time-of-week facts derived from the snapshot clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub slot: PatternKey,
    /// Wall-clock time as `HH:MM`.
    pub clock: String,
}

impl TemporalContext {
    pub fn at(time: &DateTime<FixedOffset>) -> Self {
        Self {
            slot: PatternKey::at(time),
            clock: time.format("%H:%M").to_string(),
        }
    }
}

/// Immutable view of sensed reality for one pipeline run.
///
/// Built once by the snapshot builder and only read afterwards; there are no
/// mutating methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    items: Vec<SensedItem>,
    current_time: DateTime<FixedOffset>,
    temporal: TemporalContext,
    #[serde(default)]
    facts: Map<String, Value>,
    #[serde(default)]
    data_unavailable: bool,
}

impl ContextSnapshot {
    pub fn new(items: Vec<SensedItem>, current_time: DateTime<FixedOffset>) -> Self {
        Self {
            temporal: TemporalContext::at(&current_time),
            items,
            current_time,
            facts: Map::new(),
            data_unavailable: false,
        }
    }

    /// Attaches derived facts (observed metrics keyed `domain.condition`).
    pub fn with_facts(mut self, facts: Map<String, Value>) -> Self {
        self.facts = facts;
        self
    }

    /// Marks the snapshot as built from an empty or failing source.
    pub fn mark_data_unavailable(mut self) -> Self {
        self.data_unavailable = true;
        self
    }

    pub fn items(&self) -> &[SensedItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&SensedItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_time(&self) -> DateTime<FixedOffset> {
        self.current_time
    }

    pub fn temporal(&self) -> &TemporalContext {
        &self.temporal
    }

    pub fn facts(&self) -> &Map<String, Value> {
        &self.facts
    }

    pub fn data_unavailable(&self) -> bool {
        self.data_unavailable
    }

    /// JSON payload handed to inference stages.
    pub fn to_payload(&self) -> Value {
        json!({
            "current_time": self.current_time.to_rfc3339(),
            "day": weekday_name(self.temporal.slot.weekday),
            "time": self.temporal.clock,
            "hour_bucket": self.temporal.slot.bucket.as_str(),
            "facts": self.facts,
            "data_unavailable": self.data_unavailable,
            "items": self.items,
        })
    }
}

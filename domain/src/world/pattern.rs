//! Behavioral patterns keyed by weekday and hour bucket.

use crate::core::error::DomainError;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Coarse part of the day a pattern was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourBucket {
    /// 00:00 - 05:59
    Night,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl HourBucket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => HourBucket::Night,
            6..=11 => HourBucket::Morning,
            12..=17 => HourBucket::Afternoon,
            _ => HourBucket::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HourBucket::Night => "night",
            HourBucket::Morning => "morning",
            HourBucket::Afternoon => "afternoon",
            HourBucket::Evening => "evening",
        }
    }
}

impl FromStr for HourBucket {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "night" => Ok(HourBucket::Night),
            "morning" => Ok(HourBucket::Morning),
            "afternoon" => Ok(HourBucket::Afternoon),
            "evening" => Ok(HourBucket::Evening),
            other => Err(DomainError::InvalidPatternKey(other.to_string())),
        }
    }
}

/// Lowercase English weekday name (`monday`, `tuesday`, ...).
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// `(weekday, hour-bucket)` key of a pattern entry.
///
/// Serialized as `"monday/morning"` so that pattern maps stay plain JSON objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub weekday: Weekday,
    pub bucket: HourBucket,
}

impl PatternKey {
    pub fn new(weekday: Weekday, bucket: HourBucket) -> Self {
        Self { weekday, bucket }
    }

    /// Key for the moment `time` falls into (in its own offset).
    pub fn at(time: &DateTime<FixedOffset>) -> Self {
        Self {
            weekday: time.weekday(),
            bucket: HourBucket::from_hour(time.hour()),
        }
    }
}

impl Ord for PatternKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weekday
            .num_days_from_monday()
            .cmp(&other.weekday.num_days_from_monday())
            .then(self.bucket.cmp(&other.bucket))
    }
}

impl PartialOrd for PatternKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", weekday_name(self.weekday), self.bucket.as_str())
    }
}

impl FromStr for PatternKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, bucket) = s
            .split_once('/')
            .ok_or_else(|| DomainError::InvalidPatternKey(s.to_string()))?;
        let weekday =
            parse_weekday(day).ok_or_else(|| DomainError::InvalidPatternKey(s.to_string()))?;
        Ok(Self {
            weekday,
            bucket: bucket.parse()?,
        })
    }
}

impl Serialize for PatternKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PatternKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Observed-behavior descriptor stored under a [`PatternKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternEntry {
    /// How often each action was applied in this slot (`label:important`, `skip`, ...).
    pub action_counts: BTreeMap<String, u32>,
    /// Number of processed items folded into this entry.
    pub observations: u32,
    /// Running accuracy of the actions taken in this slot, when feedback was given.
    pub accuracy: Option<f64>,
    pub last_seen: Option<DateTime<FixedOffset>>,
}

impl PatternEntry {
    /// Records one observed action.
    pub fn record(&mut self, action: &str, at: DateTime<FixedOffset>) {
        *self.action_counts.entry(action.to_string()).or_insert(0) += 1;
        self.observations += 1;
        self.touch(at);
    }

    fn touch(&mut self, at: DateTime<FixedOffset>) {
        if self.last_seen.is_none_or(|seen| seen < at) {
            self.last_seen = Some(at);
        }
    }

    /// Additively merges `other` into `self`.
    ///
    /// Counts are summed; accuracies are averaged weighted by observations.
    pub fn merge(&mut self, other: &PatternEntry) {
        self.accuracy = match (self.accuracy, other.accuracy) {
            (Some(a), Some(b)) => {
                let total = self.observations + other.observations;
                if total == 0 {
                    Some((a + b) / 2.0)
                } else {
                    Some(
                        (a * f64::from(self.observations) + b * f64::from(other.observations))
                            / f64::from(total),
                    )
                }
            }
            (a, b) => a.or(b),
        };
        for (action, count) in &other.action_counts {
            *self.action_counts.entry(action.clone()).or_insert(0) += count;
        }
        self.observations += other.observations;
        if let Some(at) = other.last_seen {
            self.touch(at);
        }
    }

    /// Most frequent action, ties broken alphabetically.
    pub fn dominant_action(&self) -> Option<&str> {
        self.action_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(action, _)| action.as_str())
    }

    /// Human-readable summary, e.g. `label:important x3, skip x5`.
    pub fn descriptor(&self) -> String {
        self.action_counts
            .iter()
            .map(|(action, count)| format!("{} x{}", action, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, day, hour, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_hour_bucket_boundaries() {
        assert_eq!(HourBucket::from_hour(0), HourBucket::Night);
        assert_eq!(HourBucket::from_hour(5), HourBucket::Night);
        assert_eq!(HourBucket::from_hour(6), HourBucket::Morning);
        assert_eq!(HourBucket::from_hour(12), HourBucket::Afternoon);
        assert_eq!(HourBucket::from_hour(18), HourBucket::Evening);
        assert_eq!(HourBucket::from_hour(23), HourBucket::Evening);
    }

    #[test]
    fn test_pattern_key_from_time() {
        // 2024-06-03 is a Monday
        let key = PatternKey::at(&at(3, 9));
        assert_eq!(key.weekday, Weekday::Mon);
        assert_eq!(key.bucket, HourBucket::Morning);
        assert_eq!(key.to_string(), "monday/morning");
    }

    #[test]
    fn test_pattern_key_string_roundtrip_and_errors() {
        let key: PatternKey = "friday/evening".parse().unwrap();
        assert_eq!(key, PatternKey::new(Weekday::Fri, HourBucket::Evening));
        assert!("friday".parse::<PatternKey>().is_err());
        assert!("someday/morning".parse::<PatternKey>().is_err());
        assert!("monday/noon".parse::<PatternKey>().is_err());
    }

    #[test]
    fn test_pattern_keys_order_by_weekday_then_bucket() {
        let mut keys = vec![
            PatternKey::new(Weekday::Tue, HourBucket::Night),
            PatternKey::new(Weekday::Mon, HourBucket::Evening),
            PatternKey::new(Weekday::Mon, HourBucket::Morning),
        ];
        keys.sort();
        assert_eq!(keys[0].to_string(), "monday/morning");
        assert_eq!(keys[2].to_string(), "tuesday/night");
    }

    #[test]
    fn test_entry_merge_is_additive() {
        let mut a = PatternEntry::default();
        a.record("skip", at(3, 9));
        a.accuracy = Some(1.0);

        let mut b = PatternEntry::default();
        b.record("label:important", at(3, 10));
        b.record("skip", at(3, 10));
        b.accuracy = Some(0.4);

        a.merge(&b);
        assert_eq!(a.observations, 3);
        assert_eq!(a.action_counts["skip"], 2);
        assert_eq!(a.action_counts["label:important"], 1);
        // (1.0 * 1 + 0.4 * 2) / 3
        assert!((a.accuracy.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(a.last_seen, Some(at(3, 10)));
        assert_eq!(a.dominant_action(), Some("skip"));
        assert_eq!(a.descriptor(), "label:important x1, skip x2");
    }
}

//! Keyword heuristics behind `score_priority` and `classify`.

use gapwise_domain::SensedItem;
use serde_json::Value;

const URGENT_WORDS: &[&str] = &[
    "urgent", "asap", "immediately", "deadline", "today", "action required", "important",
];

/// Topic label and the words that select it.
const TOPICS: &[(&str, &[&str])] = &[
    ("finance", &["invoice", "payment", "receipt", "bill", "refund"]),
    ("meetings", &["meeting", "invite", "calendar", "agenda", "call"]),
    ("newsletters", &["newsletter", "unsubscribe", "digest", "weekly"]),
    ("travel", &["flight", "hotel", "booking", "itinerary"]),
];

fn text_of(item: &SensedItem) -> String {
    ["subject", "title", "body", "snippet", "from", "sender"]
        .iter()
        .filter_map(|field| item.str_field(field))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Priority between 0 and 1.
///
/// An explicit `priority` (or `hidden_priority`) field wins; otherwise the
/// score is built up from flags and urgent wording.
pub(super) fn priority_score(item: &SensedItem) -> f64 {
    let declared = item
        .str_field("priority")
        .or_else(|| item.str_field("hidden_priority"));
    if let Some(priority) = declared {
        match priority.to_lowercase().as_str() {
            "high" | "urgent" => return 0.9,
            "medium" | "normal" => return 0.5,
            "low" => return 0.2,
            _ => {}
        }
    }
    if let Some(Value::Number(n)) = item.field("priority")
        && let Some(n) = n.as_f64()
    {
        return n.clamp(0.0, 1.0);
    }

    let mut score: f64 = 0.2;
    if item.bool_field("flagged") == Some(true) || item.bool_field("starred") == Some(true) {
        score += 0.4;
    }
    if item.bool_field("important") == Some(true) {
        score += 0.3;
    }
    let text = text_of(item);
    if URGENT_WORDS.iter().any(|word| text.contains(word)) {
        score += 0.3;
    }
    if item.bool_field("read") == Some(false) || item.bool_field("unread") == Some(true) {
        score += 0.1;
    }
    score.min(1.0)
}

/// Topic for `item`, if any keyword matches.
pub(super) fn topic(item: &SensedItem) -> Option<&'static str> {
    if let Some(category) = item.str_field("category")
        && let Some((label, _)) = TOPICS.iter().find(|(label, _)| *label == category)
    {
        return Some(label);
    }
    let text = text_of(item);
    TOPICS
        .iter()
        .find(|(_, words)| words.iter().any(|word| text.contains(word)))
        .map(|(label, _)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declared_priority_wins() {
        let item = SensedItem::new("m1", json!({"priority": "low", "flagged": true}));
        assert_eq!(priority_score(&item), 0.2);
        let item = SensedItem::new("m2", json!({"hidden_priority": "high"}));
        assert_eq!(priority_score(&item), 0.9);
        let item = SensedItem::new("m3", json!({"priority": 0.75}));
        assert_eq!(priority_score(&item), 0.75);
    }

    #[test]
    fn test_flags_and_wording_raise_score() {
        let plain = SensedItem::new("m1", json!({"subject": "lunch?", "read": true}));
        let flagged = SensedItem::new(
            "m2",
            json!({"subject": "URGENT: contract", "flagged": true, "read": false}),
        );
        assert!(priority_score(&plain) < 0.5);
        assert!(priority_score(&flagged) > 0.9);
        assert!(priority_score(&flagged) <= 1.0);
    }

    #[test]
    fn test_topic() {
        let item = SensedItem::new("m1", json!({"subject": "Your invoice for March"}));
        assert_eq!(topic(&item), Some("finance"));
        let item = SensedItem::new("m2", json!({"category": "travel", "subject": "hi"}));
        assert_eq!(topic(&item), Some("travel"));
        let item = SensedItem::new("m3", json!({"subject": "hello"}));
        assert_eq!(topic(&item), None);
    }
}

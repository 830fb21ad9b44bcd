//! Human feedback on execution outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Feedback {
    Confirmed,
    Corrected { expected: String },
}

impl Feedback {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Feedback::Confirmed)
    }
}

/// Feedback keyed by item reference. Items without an entry got no feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackMap(BTreeMap<String, Feedback>);

impl FeedbackMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirms every listed item.
    pub fn confirm_all<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            items
                .into_iter()
                .map(|i| (i.into(), Feedback::Confirmed))
                .collect(),
        )
    }

    pub fn insert(&mut self, item_ref: impl Into<String>, feedback: Feedback) {
        self.0.insert(item_ref.into(), feedback);
    }

    pub fn get(&self, item_ref: &str) -> Option<&Feedback> {
        self.0.get(item_ref)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Feedback)> {
        self.0.iter()
    }

    /// Share of confirmed entries; `None` when no feedback was given.
    pub fn accuracy(&self) -> Option<f64> {
        accuracy(self.0.values())
    }
}

/// `confirmed / total`, or `None` for an empty iterator.
pub fn accuracy<'a>(feedback: impl IntoIterator<Item = &'a Feedback>) -> Option<f64> {
    let (confirmed, total) = feedback
        .into_iter()
        .fold((0u32, 0u32), |(c, t), f| (c + u32::from(f.is_confirmed()), t + 1));
    (total > 0).then(|| f64::from(confirmed) / f64::from(total))
}

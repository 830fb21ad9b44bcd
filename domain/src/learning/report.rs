use crate::world::pattern::PatternKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAdjustment {
    pub domain: String,
    pub condition: String,
    pub from: f64,
    pub to: f64,
}

/// What the learner changed in the world model for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningReport {
    /// Confirmed share of items with feedback; `None` without feedback.
    pub accuracy: Option<f64>,
    pub feedback_count: usize,
    pub patterns_updated: Vec<PatternKey>,
    pub adjustments: Vec<ThresholdAdjustment>,
    /// Rejection reason when the run folded a rejected solution.
    #[serde(default)]
    pub rejection: Option<String>,
}

impl LearningReport {
    pub fn is_noop(&self) -> bool {
        self.patterns_updated.is_empty() && self.adjustments.is_empty()
    }
}

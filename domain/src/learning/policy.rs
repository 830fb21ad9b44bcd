//! Bounded threshold recalibration.

use crate::world::entities::Comparison;
use serde::{Deserialize, Serialize};

/// Step sizes for recalibrating ideal-state thresholds from accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningPolicy {
    /// Step as a fraction of the current threshold.
    pub step_ratio: f64,
    /// Smallest step, so thresholds near zero still move.
    pub min_step: f64,
    /// Largest step in either direction.
    pub max_step: f64,
}

impl Default for LearningPolicy {
    fn default() -> Self {
        Self {
            step_ratio: 0.1,
            min_step: 0.1,
            max_step: 2.0,
        }
    }
}

impl LearningPolicy {
    /// Signed step for `accuracy`: negative tightens an `at_most` threshold.
    ///
    /// `signal = 2a - 1`, `delta = -signal * max(|t| * step_ratio, min_step)`,
    /// clamped to `±max_step`.
    pub fn delta(&self, threshold: f64, accuracy: f64) -> f64 {
        let signal = 2.0 * accuracy.clamp(0.0, 1.0) - 1.0;
        let magnitude = (threshold.abs() * self.step_ratio).max(self.min_step);
        let bound = self.max_step.abs();
        (-signal * magnitude).clamp(-bound, bound)
    }

    /// Next threshold for an ideal state compared with `comparison`.
    ///
    /// High accuracy tightens the ideal (lower ceiling for `at_most`, higher
    /// floor for `at_least`); low accuracy loosens it. `at_most` thresholds
    /// never go below zero.
    pub fn next_threshold(&self, threshold: f64, accuracy: f64, comparison: Comparison) -> f64 {
        let delta = self.delta(threshold, accuracy);
        match comparison {
            Comparison::AtMost => (threshold + delta).max(0.0),
            Comparison::AtLeast => threshold - delta,
        }
    }
}

//! Stage configuration from TOML (`[pipeline]`, `[composer]`, `[learning]`)

use gapwise_domain::{AgentParameters, ConfigIssue, ConfigIssueCode, LearningPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Solutions requested per exploration round
    pub solution_count: usize,
    /// Items the agent executor processes at once
    pub max_concurrency: usize,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        Self {
            solution_count: 3,
            max_concurrency: 4,
        }
    }
}

impl FilePipelineConfig {
    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.solution_count == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroSolutionCount,
                "pipeline.solution_count must be at least 1",
            ));
        }
        if self.max_concurrency == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroConcurrency,
                "pipeline.max_concurrency is 0, using 1",
            ));
        }
        issues
    }
}

/// Defaults for agent parameters the composer could not extract
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileComposerConfig {
    pub default_threshold: f64,
    pub default_label: String,
    pub fallback_label: String,
    pub notify_channel: String,
}

impl Default for FileComposerConfig {
    fn default() -> Self {
        let defaults = AgentParameters::default();
        Self {
            default_threshold: defaults.threshold,
            default_label: defaults.label,
            fallback_label: defaults.fallback_label,
            notify_channel: defaults.notify_channel,
        }
    }
}

impl FileComposerConfig {
    pub fn to_agent_parameters(&self) -> AgentParameters {
        AgentParameters {
            threshold: self.default_threshold.clamp(0.0, 1.0),
            label: self.default_label.clone(),
            fallback_label: self.fallback_label.clone(),
            notify_channel: self.notify_channel.clone(),
        }
    }

    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        if (0.0..=1.0).contains(&self.default_threshold) {
            return Vec::new();
        }
        vec![ConfigIssue::warning(
            ConfigIssueCode::ThresholdOutOfRange,
            format!(
                "composer.default_threshold: {} is outside 0..=1 and will be clamped",
                self.default_threshold
            ),
        )]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLearningConfig {
    pub step_ratio: f64,
    pub min_step: f64,
    pub max_step: f64,
}

impl Default for FileLearningConfig {
    fn default() -> Self {
        let policy = LearningPolicy::default();
        Self {
            step_ratio: policy.step_ratio,
            min_step: policy.min_step,
            max_step: policy.max_step,
        }
    }
}

impl FileLearningConfig {
    pub fn to_policy(&self) -> LearningPolicy {
        LearningPolicy {
            step_ratio: self.step_ratio,
            min_step: self.min_step,
            max_step: self.max_step,
        }
    }

    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        let negative = self.step_ratio < 0.0 || self.min_step < 0.0 || self.max_step < 0.0;
        if negative || self.min_step > self.max_step {
            return vec![ConfigIssue::error(
                ConfigIssueCode::InvalidLearningStep,
                format!(
                    "learning: steps must be non-negative with min_step <= max_step (got ratio={}, min={}, max={})",
                    self.step_ratio, self.min_step, self.max_step
                ),
            )];
        }
        Vec::new()
    }
}

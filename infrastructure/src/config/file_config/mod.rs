//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod inference;
mod output;
mod pipeline;
mod providers;
mod storage;

pub use inference::{FileInferenceConfig, InferenceProvider};
pub use output::FileOutputConfig;
pub use pipeline::{FileComposerConfig, FileLearningConfig, FilePipelineConfig};
pub use providers::{FileAnthropicConfig, FileProvidersConfig};
pub use storage::{FileLoggingConfig, FileStorageConfig};

use gapwise_application::PipelineParams;
use gapwise_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Which inference backend answers the pipeline's questions
    pub inference: FileInferenceConfig,
    /// Provider credentials and endpoints
    pub providers: FileProvidersConfig,
    /// Stage control
    pub pipeline: FilePipelineConfig,
    /// Agent parameter defaults
    pub composer: FileComposerConfig,
    /// Threshold recalibration steps
    pub learning: FileLearningConfig,
    /// Where the world model, sensed items and run checkpoints live
    pub storage: FileStorageConfig,
    /// Log destinations
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. The inference provider name and its timeout
    /// 2. Pipeline counts
    /// 3. Composer defaults and learning steps
    /// 4. The API key of a remote provider
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.inference.validate());
        issues.extend(self.pipeline.validate());
        issues.extend(self.composer.validate());
        issues.extend(self.learning.validate());

        if self.inference.parse_provider() == Some(InferenceProvider::Anthropic) {
            issues.extend(self.providers.anthropic.validate());
        }

        issues
    }

    /// Stage parameters for the orchestrator.
    pub fn to_pipeline_params(&self) -> PipelineParams {
        PipelineParams::default()
            .with_solution_count(self.pipeline.solution_count)
            .with_max_concurrency(self.pipeline.max_concurrency)
            .with_inference_timeout(Duration::from_secs(self.inference.timeout_secs.max(1)))
            .with_agent_defaults(self.composer.to_agent_parameters())
            .with_learning(self.learning.to_policy())
    }
}

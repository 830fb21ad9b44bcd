//! Configuration file loading for gapwise
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `GAPWISE_*` environment variables (`GAPWISE_PIPELINE__SOLUTION_COUNT=5`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./gapwise.toml` or `./.gapwise.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/gapwise/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileAnthropicConfig, FileComposerConfig, FileConfig, FileInferenceConfig,
    FileLearningConfig, FileLoggingConfig, FileOutputConfig, FilePipelineConfig,
    FileProvidersConfig, FileStorageConfig, InferenceProvider,
};
pub use loader::ConfigLoader;

//! Structured configuration issues.
//!
//! Validation itself lives next to the file configuration; this module only
//! defines the issue vocabulary shared by the loader and the CLI.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// `inference.provider` is not a known provider.
    UnknownProvider,
    /// `pipeline.solution_count` is zero.
    ZeroSolutionCount,
    /// `pipeline.max_concurrency` is zero.
    ZeroConcurrency,
    /// `inference.timeout_secs` is zero.
    NonPositiveTimeout,
    /// Learning steps are negative or `min_step > max_step`.
    InvalidLearningStep,
    /// `composer.default_threshold` is outside `0..=1`.
    ThresholdOutOfRange,
    /// The API key environment variable for a remote provider is unset.
    MissingApiKey,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

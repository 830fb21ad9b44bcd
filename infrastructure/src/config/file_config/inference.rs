//! Inference configuration from TOML (`[inference]` section)

use gapwise_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Inference backends gapwise can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceProvider {
    /// Deterministic heuristics; no network access
    Offline,
    /// Anthropic Messages API
    Anthropic,
}

impl InferenceProvider {
    pub const ALL: [&'static str; 2] = ["offline", "anthropic"];
}

impl FromStr for InferenceProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "offline" | "heuristic" => Ok(InferenceProvider::Offline),
            "anthropic" | "claude" => Ok(InferenceProvider::Anthropic),
            other => Err(format!("unknown inference provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInferenceConfig {
    /// "offline" or "anthropic"
    pub provider: String,
    /// Model name sent to remote providers
    pub model: String,
    /// Bound on every inference call, in seconds
    pub timeout_secs: u64,
}

impl Default for FileInferenceConfig {
    fn default() -> Self {
        Self {
            provider: "offline".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            timeout_secs: 60,
        }
    }
}

impl FileInferenceConfig {
    pub fn parse_provider(&self) -> Option<InferenceProvider> {
        self.provider.parse().ok()
    }

    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.parse_provider().is_none() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnknownProvider,
                format!(
                    "inference.provider: unknown value '{}' (expected one of: {})",
                    self.provider,
                    InferenceProvider::ALL.join(", ")
                ),
            ));
        }
        if self.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NonPositiveTimeout,
                "inference.timeout_secs must be greater than 0",
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_aliases() {
        assert_eq!(
            "Claude".parse::<InferenceProvider>(),
            Ok(InferenceProvider::Anthropic)
        );
        assert_eq!(
            " offline ".parse::<InferenceProvider>(),
            Ok(InferenceProvider::Offline)
        );
        assert!("openai".parse::<InferenceProvider>().is_err());
    }
}

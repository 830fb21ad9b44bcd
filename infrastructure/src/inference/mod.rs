//! Inference gateways: the Anthropic Messages API and an offline heuristic.

mod anthropic;
mod heuristic;

pub use anthropic::AnthropicGateway;
pub use heuristic::HeuristicGateway;

use crate::config::{FileConfig, InferenceProvider};
use async_trait::async_trait;
use gapwise_application::ports::inference_gateway::{GatewayError, InferenceGateway};
use gapwise_domain::InferenceRequest;
use tracing::info;

/// The gateway selected by `[inference].provider`.
///
/// A closed enum keeps the pipeline generic over a single concrete type.
pub enum ConfiguredGateway {
    Offline(HeuristicGateway),
    Anthropic(AnthropicGateway),
}

impl ConfiguredGateway {
    /// Builds the configured provider; `force_offline` overrides the config.
    pub fn from_config(config: &FileConfig, force_offline: bool) -> Result<Self, GatewayError> {
        let provider = if force_offline {
            InferenceProvider::Offline
        } else {
            config.inference.parse_provider().ok_or_else(|| {
                GatewayError::ModelNotAvailable(format!(
                    "unknown inference provider '{}'",
                    config.inference.provider
                ))
            })?
        };

        let gateway = match provider {
            InferenceProvider::Offline => ConfiguredGateway::Offline(HeuristicGateway::new()),
            InferenceProvider::Anthropic => ConfiguredGateway::Anthropic(AnthropicGateway::new(
                &config.providers.anthropic,
                config.inference.model.clone(),
            )?),
        };
        info!("Inference provider: {}", gateway.name());
        Ok(gateway)
    }
}

#[async_trait]
impl InferenceGateway for ConfiguredGateway {
    async fn complete(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        match self {
            ConfiguredGateway::Offline(g) => g.complete(request).await,
            ConfiguredGateway::Anthropic(g) => g.complete(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ConfiguredGateway::Offline(g) => g.name(),
            ConfiguredGateway::Anthropic(g) => g.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_offline() {
        let gateway = ConfiguredGateway::from_config(&FileConfig::default(), false).unwrap();
        assert_eq!(gateway.name(), "offline");
    }

    #[test]
    fn test_force_offline_wins() {
        let mut config = FileConfig::default();
        config.inference.provider = "anthropic".to_string();
        config.providers.anthropic.api_key_env = "GAPWISE_TEST_UNSET_KEY_VAR".to_string();
        assert!(ConfiguredGateway::from_config(&config, false).is_err());
        let gateway = ConfiguredGateway::from_config(&config, true).unwrap();
        assert_eq!(gateway.name(), "offline");
    }
}

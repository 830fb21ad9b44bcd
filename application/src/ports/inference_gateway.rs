//! Inference gateway port
//!
//! Defines the interface for structured language-model completions.

use async_trait::async_trait;
use gapwise_domain::InferenceRequest;
use thiserror::Error;

/// Errors that can occur during gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Gateway for inference calls
///
/// Implementations (adapters) live in the infrastructure layer. Callers bound
/// every call with their own timeout; implementations need not.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Complete one request, returning the raw model text.
    async fn complete(&self, request: &InferenceRequest) -> Result<String, GatewayError>;

    /// Short provider name used in logs.
    fn name(&self) -> &str {
        "inference"
    }
}

//! Shared utilities for use cases.
//!
//! Contains cancellation checking, the bounded inference client used by every
//! inference stage, the stage error type and the world model handle.

use crate::ports::inference_gateway::{GatewayError, InferenceGateway};
use crate::ports::inference_logger::{InferenceEvent, InferenceLogger, NoInferenceLogger};
use gapwise_domain::inference::ParseError;
use gapwise_domain::{FailureKind, InferenceRequest, OutputSchema, WorldModel};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// ==================== Errors ====================

/// Failure of a single inference call after the retry policy was applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Malformed {schema} response: {message}")]
    Malformed {
        schema: OutputSchema,
        message: String,
    },

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl InferenceError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            InferenceError::Malformed { .. } => FailureKind::InferenceMalformed,
            InferenceError::Timeout(_) => FailureKind::InferenceTimeout,
            InferenceError::Gateway(_) => FailureKind::Gateway,
        }
    }
}

/// Errors a pipeline stage can end with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("Sensed data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Expectation unavailable: {0}")]
    ExpectationUnavailable(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("No valid solutions after retry")]
    NoSolutions,

    #[error("Operation cancelled")]
    Cancelled,
}

impl StageError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageError::Cancelled)
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            StageError::DataUnavailable(_) | StageError::ExpectationUnavailable(_) => {
                FailureKind::ExpectationUnavailable
            }
            StageError::Inference(e) => e.failure_kind(),
            StageError::NoSolutions => FailureKind::NoSolutions,
            StageError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Check if cancellation has been requested.
///
/// Returns `Err(StageError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), StageError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(StageError::Cancelled);
    }
    Ok(())
}

// ==================== Inference Client ====================

/// Bounded, logged access to the inference gateway.
///
/// Every call is wrapped in `tokio::time::timeout`. [`InferenceClient::request`]
/// retries once with a stricter instruction when the response does not parse;
/// timeouts and gateway errors are never retried.
pub struct InferenceClient<G: InferenceGateway + 'static> {
    gateway: Arc<G>,
    timeout: Duration,
    logger: Arc<dyn InferenceLogger>,
}

impl<G: InferenceGateway + 'static> Clone for InferenceClient<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            timeout: self.timeout,
            logger: self.logger.clone(),
        }
    }
}

impl<G: InferenceGateway + 'static> InferenceClient<G> {
    pub fn new(gateway: Arc<G>, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            logger: Arc::new(NoInferenceLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn InferenceLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One bounded call, no retry.
    pub async fn call_once(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.logger.log(InferenceEvent::new(
            "inference_request",
            json!({
                "provider": self.gateway.name(),
                "schema": request.schema.as_str(),
                "strict": request.strict,
                "system": request.system_instruction,
                "payload": request.payload,
            }),
        ));

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.gateway.complete(request)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Err(_) => Err(InferenceError::Timeout(self.timeout)),
            Ok(Err(GatewayError::Timeout)) => Err(InferenceError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(InferenceError::Gateway(e)),
            Ok(Ok(text)) => Ok(text),
        };

        match &result {
            Ok(text) => {
                debug!(
                    "{} response received in {}ms ({} bytes)",
                    request.schema,
                    elapsed_ms,
                    text.len()
                );
                self.logger.log(InferenceEvent::new(
                    "inference_response",
                    json!({
                        "schema": request.schema.as_str(),
                        "elapsed_ms": elapsed_ms,
                        "text": text,
                    }),
                ));
            }
            Err(e) => {
                warn!("{} inference failed after {}ms: {}", request.schema, elapsed_ms, e);
                self.logger.log(InferenceEvent::new(
                    "inference_error",
                    json!({
                        "schema": request.schema.as_str(),
                        "elapsed_ms": elapsed_ms,
                        "error": e.to_string(),
                    }),
                ));
            }
        }
        result
    }

    /// Calls and parses, retrying once with [`InferenceRequest::stricter`] on a
    /// parse failure.
    pub async fn request<T, F>(&self, request: InferenceRequest, parse: F) -> Result<T, InferenceError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        let text = self.call_once(&request).await?;
        let first = match parse(&text) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        warn!(
            "Malformed {} response ({}), retrying with strict instruction",
            request.schema, first
        );

        let strict = request.stricter();
        let text = self.call_once(&strict).await?;
        parse(&text).map_err(|e| InferenceError::Malformed {
            schema: request.schema,
            message: e.to_string(),
        })
    }
}

// ==================== World Model Handle ====================

/// Shared ownership of the world model.
///
/// Stages work on cloned read snapshots; only the outcome learner takes the
/// write lock, and never across an inference call. The run lock allows one
/// active pipeline run per model, however many orchestrators share it.
#[derive(Clone)]
pub struct WorldModelHandle {
    inner: Arc<RwLock<WorldModel>>,
    run_lock: Arc<Mutex<()>>,
}

impl WorldModelHandle {
    pub fn new(model: WorldModel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Claims the model for one run; `None` while another run holds it.
    pub fn try_begin_run(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.run_lock).try_lock_owned().ok()
    }

    /// A cloned snapshot of the current model.
    pub async fn read(&self) -> WorldModel {
        self.inner.read().await.clone()
    }

    /// Mutates the model under the write lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut WorldModel) -> R) -> R {
        let mut guard = self.inner.write().await;
        f(&mut guard)
    }
}

//! Port for structured inference logging.
//!
//! Defines the [`InferenceLogger`] trait for recording every inference
//! request and response to a structured log. The pipeline also records its
//! audit trail here: `solution_decision`, `agent_execution` and
//! `pipeline_paused` events.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! model transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured inference event.
pub struct InferenceEvent {
    /// Event type identifier (`inference_request`, `inference_response`, ...).
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl InferenceEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging inference events.
///
/// `log` is synchronous and infallible so that logging never disrupts a run.
pub trait InferenceLogger: Send + Sync {
    fn log(&self, event: InferenceEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoInferenceLogger;

impl InferenceLogger for NoInferenceLogger {
    fn log(&self, _event: InferenceEvent) {}
}

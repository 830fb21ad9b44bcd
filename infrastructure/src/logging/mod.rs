//! Inference transcript logging.
//!
//! Provides [`JsonlInferenceLogger`], a JSONL file writer that implements
//! the [`InferenceLogger`](gapwise_application::InferenceLogger) port.

mod inference_log;

pub use inference_log::JsonlInferenceLogger;

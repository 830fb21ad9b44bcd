//! Infrastructure layer for gapwise
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: inference gateways, JSON stores, the builtin
//! tools, the inference transcript log and configuration file loading.

pub mod config;
pub mod inference;
pub mod logging;
pub mod storage;
pub mod tools;

#[cfg(test)]
mod scenario_tests;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig, InferenceProvider};
pub use inference::{AnthropicGateway, ConfiguredGateway, HeuristicGateway};
pub use logging::JsonlInferenceLogger;
pub use storage::{JsonCheckpointStore, JsonSensedItems, JsonWorldModelStore};
pub use tools::BuiltinToolExecutor;

//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod checkpoint_store;
pub mod clock;
pub mod human_checkpoint;
pub mod inference_gateway;
pub mod inference_logger;
pub mod progress;
pub mod sensed_data;
pub mod tool_executor;
pub mod world_model_store;

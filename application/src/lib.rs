//! Application layer for gapwise
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::PipelineParams;
pub use ports::{
    checkpoint_store::{CheckpointStore, NoCheckpointStore},
    clock::{Clock, FixedClock, SystemClock},
    human_checkpoint::{
        ApprovalDecision, AutoApproveCheckpoint, AutoRejectCheckpoint, CheckpointError,
        HumanCheckpointPort,
    },
    inference_gateway::{GatewayError, InferenceGateway},
    inference_logger::{InferenceEvent, InferenceLogger, NoInferenceLogger},
    progress::{NoProgress, PipelineProgressNotifier},
    sensed_data::{NoSensedData, SensedDataSource},
    tool_executor::{ToolError, ToolExecutorPort},
    world_model_store::{StoreError, WorldModelStore},
};
pub use use_cases::run_pipeline::{PipelineError, RunPipelineUseCase};
pub use use_cases::shared::{InferenceClient, InferenceError, StageError, WorldModelHandle};

//! Pipeline run persistence port
//!
//! Runs are saved after every state transition so that a paused or
//! interrupted run can be resumed in a later process.

use super::world_model_store::StoreError;
use async_trait::async_trait;
use gapwise_domain::{PipelineRun, RunId};

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, run: &PipelineRun) -> Result<(), StoreError>;

    /// Loads a run; `StoreError::NotFound` when it does not exist.
    async fn load(&self, id: &RunId) -> Result<PipelineRun, StoreError>;

    /// Most recently updated run, if any.
    async fn latest(&self) -> Result<Option<PipelineRun>, StoreError>;
}

/// Store that keeps nothing; runs cannot be resumed.
pub struct NoCheckpointStore;

#[async_trait]
impl CheckpointStore for NoCheckpointStore {
    async fn save(&self, _run: &PipelineRun) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load(&self, id: &RunId) -> Result<PipelineRun, StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn latest(&self) -> Result<Option<PipelineRun>, StoreError> {
        Ok(None)
    }
}

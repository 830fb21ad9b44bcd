//! Type definitions for the RunPipeline use case.

use crate::ports::world_model_store::StoreError;
use gapwise_domain::{DomainError, RunId, SolutionId};
use thiserror::Error;

/// Errors the orchestrator returns to its caller.
///
/// Stage failures are not errors at this level: they pause the run and are
/// reported through [`gapwise_domain::PipelineRun::failure`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Another pipeline run is already active for this world model")]
    Busy,

    #[error("Run not found: {0}")]
    RunNotFound(RunId),

    #[error("Invalid state: expected {expected}, run is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    #[error("Run record is missing {0}")]
    Incomplete(&'static str),

    #[error("Unknown solution: {0}")]
    UnknownSolution(SolutionId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineError::Busy)
    }
}

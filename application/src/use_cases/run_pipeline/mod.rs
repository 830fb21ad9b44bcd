//! Run Pipeline use case
//!
//! Drives a [`PipelineRun`] through the stages and the two human checkpoints:
//!
//! | State              | Next step                         | Stage            |
//! |--------------------|-----------------------------------|------------------|
//! | `Idle`             | build the snapshot                | Snapshot         |
//! | `SnapshotReady`    | synthesize the expectation        | Expectation      |
//! | `ExpectationReady` | compare and rank gaps             | Comparison       |
//! | `GapsDetected`     | interpret every gap               | Interpretation   |
//! | `ProblemsDefined`  | explore solutions for the focus   | Exploration      |
//! | `AwaitingApproval` | wait for [`ApprovalDecision`]     | Checkpoint       |
//! | `AgentComposed`    | recompose and execute             | Composition      |
//! | `Executing`        | recompose and execute             | Execution        |
//! | `Learning`         | wait for feedback, then learn     | Learning         |
//!
//! Every transition is saved through the [`CheckpointStore`]. A stage failure
//! pauses the run with a structured [`PipelineFailure`]; resuming continues
//! from the last good state. Cancellation is checked at stage boundaries only.

mod hil;
mod stages;
mod types;

pub use types::PipelineError;

use super::explore_solutions::ExploreSolutionsUseCase;
use super::shared::{InferenceClient, StageError, WorldModelHandle, check_cancelled};
use crate::config::PipelineParams;
use crate::ports::checkpoint_store::{CheckpointStore, NoCheckpointStore};
use crate::ports::clock::{Clock, SystemClock};
use crate::ports::human_checkpoint::{ApprovalDecision, HumanCheckpointPort};
use crate::ports::inference_gateway::InferenceGateway;
use crate::ports::inference_logger::{InferenceEvent, InferenceLogger, NoInferenceLogger};
use crate::ports::progress::{NoProgress, PipelineProgressNotifier};
use crate::ports::sensed_data::SensedDataSource;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::world_model_store::{StoreError, WorldModelStore};
use gapwise_domain::{
    FeedbackMap, NoticeLevel, PipelineFailure, PipelineRun, PipelineState, RunId, Stage,
    TemplateRegistry,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Use case for running the full gap → agent → learning pipeline
pub struct RunPipelineUseCase<G: InferenceGateway + 'static, T: ToolExecutorPort + 'static> {
    pub(super) gateway: Arc<G>,
    pub(super) tools: Arc<T>,
    pub(super) world: WorldModelHandle,
    pub(super) store: Arc<dyn WorldModelStore>,
    pub(super) source: Arc<dyn SensedDataSource>,
    pub(super) checkpoints: Arc<dyn CheckpointStore>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) logger: Arc<dyn InferenceLogger>,
    pub(super) templates: TemplateRegistry,
    pub(super) params: PipelineParams,
    pub(super) cancellation_token: Option<CancellationToken>,
}

impl<G: InferenceGateway + 'static, T: ToolExecutorPort + 'static> RunPipelineUseCase<G, T> {
    pub fn new(
        gateway: Arc<G>,
        tools: Arc<T>,
        world: WorldModelHandle,
        store: Arc<dyn WorldModelStore>,
        source: Arc<dyn SensedDataSource>,
    ) -> Self {
        Self {
            gateway,
            tools,
            world,
            store,
            source,
            checkpoints: Arc::new(NoCheckpointStore),
            clock: Arc::new(SystemClock),
            logger: Arc::new(NoInferenceLogger),
            templates: TemplateRegistry::default(),
            params: PipelineParams::default(),
            cancellation_token: None,
        }
    }

    pub fn with_params(mut self, params: PipelineParams) -> Self {
        self.params = params;
        self
    }

    /// Persist every transition so runs can be resumed
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_inference_logger(mut self, logger: Arc<dyn InferenceLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn world(&self) -> &WorldModelHandle {
        &self.world
    }

    // ==================== Driver ====================

    /// Starts a new run and advances it to the first checkpoint or terminal state.
    pub async fn start(
        &self,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<PipelineRun, PipelineError> {
        let _guard = self.begin()?;
        let mut run = self.new_run().await;
        self.advance(&mut run, progress).await?;
        Ok(run)
    }

    /// Reloads a saved run and continues it; a paused run continues from the
    /// state it was paused in.
    pub async fn resume(
        &self,
        id: &RunId,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<PipelineRun, PipelineError> {
        let _guard = self.begin()?;
        let mut run = self.load_for_resume(id).await?;
        self.advance(&mut run, progress).await?;
        Ok(run)
    }

    /// Most recently saved run, if any.
    pub async fn latest_run(&self) -> Result<Option<PipelineRun>, PipelineError> {
        Ok(self.checkpoints.latest().await?)
    }

    /// Applies the human's decision at the approval checkpoint.
    pub async fn decide(
        &self,
        run: &mut PipelineRun,
        decision: ApprovalDecision,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let _guard = self.begin()?;
        self.apply_decision(run, decision, progress).await?;
        self.advance(run, progress).await
    }

    /// Folds execution feedback into the world model and finishes the run.
    pub async fn learn(
        &self,
        run: &mut PipelineRun,
        feedback: FeedbackMap,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let _guard = self.begin()?;
        self.apply_feedback(run, feedback, progress).await
    }

    /// Runs a new pipeline end to end, asking `checkpoint` at every stop.
    pub async fn run_to_completion(
        &self,
        checkpoint: &dyn HumanCheckpointPort,
    ) -> Result<PipelineRun, PipelineError> {
        self.run_to_completion_with_progress(checkpoint, &NoProgress)
            .await
    }

    pub async fn run_to_completion_with_progress(
        &self,
        checkpoint: &dyn HumanCheckpointPort,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<PipelineRun, PipelineError> {
        let _guard = self.begin()?;
        let mut run = self.new_run().await;
        self.drive(&mut run, checkpoint, progress).await?;
        Ok(run)
    }

    /// Resumes a saved run and drives it end to end.
    pub async fn resume_to_completion(
        &self,
        id: &RunId,
        checkpoint: &dyn HumanCheckpointPort,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<PipelineRun, PipelineError> {
        let _guard = self.begin()?;
        let mut run = self.load_for_resume(id).await?;
        self.drive(&mut run, checkpoint, progress).await?;
        Ok(run)
    }

    // ==================== Internals ====================

    fn begin(&self) -> Result<OwnedMutexGuard<()>, PipelineError> {
        self.world.try_begin_run().ok_or(PipelineError::Busy)
    }

    async fn new_run(&self) -> PipelineRun {
        let mut run = PipelineRun::new(self.clock.now_utc());
        info!("Starting pipeline run {}", run.id);
        self.save(&mut run, Stage::Snapshot).await;
        run
    }

    async fn load_for_resume(&self, id: &RunId) -> Result<PipelineRun, PipelineError> {
        let mut run = self.checkpoints.load(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => PipelineError::RunNotFound(id.clone()),
            other => PipelineError::Store(other),
        })?;
        if run.state().is_paused() {
            let failure = run.resume(self.clock.now_utc())?;
            info!(
                "Resuming run {} from {} (was paused: {})",
                run.id,
                run.state(),
                failure
            );
            self.save(&mut run, failure.stage).await;
        } else {
            info!("Resuming run {} from {}", run.id, run.state());
        }
        Ok(run)
    }

    /// Advances until a checkpoint, a terminal state or a pause.
    pub(super) async fn advance(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        loop {
            let state = run.state().clone();
            if state.is_paused() || state.is_checkpoint() || run.is_complete() {
                return Ok(());
            }
            let stage = stages::next_stage(&state);
            if let Err(e) = check_cancelled(&self.cancellation_token) {
                self.pause(run, stage, &e).await;
                return Ok(());
            }

            match state {
                PipelineState::Idle => self.stage_snapshot(run, progress).await?,
                PipelineState::SnapshotReady => self.stage_expectation(run, progress).await?,
                PipelineState::ExpectationReady => self.stage_gaps(run, progress).await?,
                PipelineState::GapsDetected => self.stage_problems(run, progress).await?,
                PipelineState::ProblemsDefined => self.stage_solutions(run, progress).await?,
                PipelineState::SolutionsProposed => {
                    self.transition(run, PipelineState::AwaitingApproval, stage)
                        .await?
                }
                PipelineState::AgentComposed | PipelineState::Executing => {
                    self.stage_recompose(run, progress).await?
                }
                PipelineState::AwaitingApproval
                | PipelineState::Learning
                | PipelineState::NoGapTerminal
                | PipelineState::Paused { .. } => return Ok(()),
            }
        }
    }

    pub(super) fn client(&self) -> InferenceClient<G> {
        InferenceClient::new(self.gateway.clone(), self.params.inference_timeout)
            .with_logger(self.logger.clone())
    }

    pub(super) fn explorer(&self) -> ExploreSolutionsUseCase<G> {
        ExploreSolutionsUseCase::new(self.client(), self.params.solution_count)
    }

    pub(super) async fn transition(
        &self,
        run: &mut PipelineRun,
        next: PipelineState,
        stage: Stage,
    ) -> Result<(), PipelineError> {
        run.transition(next, self.clock.now_utc())?;
        self.save(run, stage).await;
        Ok(())
    }

    /// Saves the run; a failure is logged and surfaced as a notice.
    pub(super) async fn save(&self, run: &mut PipelineRun, stage: Stage) {
        if let Err(e) = self.checkpoints.save(run).await {
            error!("Failed to save run {}: {}", run.id, e);
            run.notice(
                NoticeLevel::Error,
                stage,
                format!("persistence_error: run checkpoint not saved: {}", e),
            );
        }
    }

    pub(super) async fn pause(&self, run: &mut PipelineRun, stage: Stage, err: &StageError) {
        self.pause_with(
            run,
            PipelineFailure::new(stage, err.failure_kind(), err.to_string()),
        )
        .await;
    }

    pub(super) async fn pause_with(&self, run: &mut PipelineRun, failure: PipelineFailure) {
        error!("Run {} paused in {}: {}", run.id, run.state(), failure);
        self.logger.log(InferenceEvent::new(
            "pipeline_paused",
            json!({
                "run_id": run.id.to_string(),
                "stage": failure.stage,
                "kind": failure.kind,
                "message": failure.message,
            }),
        ));
        let stage = failure.stage;
        run.pause(failure, self.clock.now_utc());
        self.save(run, stage).await;
    }
}

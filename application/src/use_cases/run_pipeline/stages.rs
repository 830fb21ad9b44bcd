//! Automatic stage steps of the RunPipeline use case.
//!
//! Each step runs one stage, stores its output on the run and transitions.
//! Stage errors pause the run instead of propagating.

use super::RunPipelineUseCase;
use super::types::PipelineError;
use crate::ports::inference_gateway::InferenceGateway;
use crate::ports::inference_logger::InferenceEvent;
use crate::ports::progress::PipelineProgressNotifier;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::build_snapshot::BuildSnapshotUseCase;
use crate::use_cases::compare_gaps::CompareGapsUseCase;
use crate::use_cases::compose_agent::ComposeAgentUseCase;
use crate::use_cases::execute_agent::ExecuteAgentUseCase;
use crate::use_cases::explore_solutions::ExploreInput;
use crate::use_cases::interpret_problems::InterpretProblemsUseCase;
use crate::use_cases::shared::check_cancelled;
use crate::use_cases::synthesize_expectation::SynthesizeExpectationUseCase;
use gapwise_domain::{
    Agent, FailureKind, NoticeLevel, PipelineFailure, PipelineRun, PipelineState, ProblemId,
    ProblemStatus, Stage,
};
use serde_json::json;
use tracing::{info, warn};

/// Stage that runs next from `state`, used to attribute pauses.
pub(super) fn next_stage(state: &PipelineState) -> Stage {
    match state {
        PipelineState::Idle => Stage::Snapshot,
        PipelineState::SnapshotReady => Stage::Expectation,
        PipelineState::ExpectationReady => Stage::Comparison,
        PipelineState::GapsDetected => Stage::Interpretation,
        PipelineState::ProblemsDefined | PipelineState::SolutionsProposed => Stage::Exploration,
        PipelineState::AgentComposed => Stage::Composition,
        PipelineState::Executing => Stage::Execution,
        PipelineState::Learning => Stage::Learning,
        PipelineState::AwaitingApproval
        | PipelineState::NoGapTerminal
        | PipelineState::Paused { .. } => Stage::Checkpoint,
    }
}

impl<G: InferenceGateway + 'static, T: ToolExecutorPort + 'static> RunPipelineUseCase<G, T> {
    pub(super) async fn stage_snapshot(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        progress.on_stage_start(Stage::Snapshot, 1);
        let model = self.world.read().await;
        let snapshot = BuildSnapshotUseCase::new(self.source.clone(), self.clock.clone())
            .execute(&model)
            .await;

        if snapshot.data_unavailable() {
            let message = "sensed data unavailable; continuing with an empty snapshot";
            run.notice(NoticeLevel::Warning, Stage::Snapshot, message);
            progress.on_degraded(Stage::Snapshot, message);
        }
        run.snapshot = Some(snapshot);
        progress.on_stage_complete(Stage::Snapshot, true);
        self.transition(run, PipelineState::SnapshotReady, Stage::Snapshot)
            .await
    }

    pub(super) async fn stage_expectation(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let snapshot = run.snapshot.clone().ok_or(PipelineError::Incomplete("snapshot"))?;
        progress.on_stage_start(Stage::Expectation, 1);

        let model = self.world.read().await;
        let result = SynthesizeExpectationUseCase::new(self.client())
            .execute(&model, &snapshot)
            .await;
        progress.on_stage_complete(Stage::Expectation, result.is_ok());

        match result {
            Ok(expectation) => {
                run.expectation = Some(expectation);
                self.transition(run, PipelineState::ExpectationReady, Stage::Expectation)
                    .await
            }
            Err(e) => {
                self.pause(run, Stage::Expectation, &e).await;
                Ok(())
            }
        }
    }

    pub(super) async fn stage_gaps(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let snapshot = run.snapshot.clone().ok_or(PipelineError::Incomplete("snapshot"))?;
        let expectation = run
            .expectation
            .clone()
            .ok_or(PipelineError::Incomplete("expectation"))?;
        progress.on_stage_start(Stage::Comparison, 1);

        let result = CompareGapsUseCase::new(self.client())
            .execute(&expectation, &snapshot)
            .await;
        progress.on_stage_complete(Stage::Comparison, result.is_ok());

        match result {
            Ok(gaps) if gaps.is_empty() => {
                info!("No gaps between expectation and reality; nothing to do");
                self.transition(run, PipelineState::GapsDetected, Stage::Comparison)
                    .await?;
                self.transition(run, PipelineState::NoGapTerminal, Stage::Comparison)
                    .await
            }
            Ok(gaps) => {
                run.gaps = gaps;
                self.transition(run, PipelineState::GapsDetected, Stage::Comparison)
                    .await
            }
            Err(e) => {
                self.pause(run, Stage::Comparison, &e).await;
                Ok(())
            }
        }
    }

    pub(super) async fn stage_problems(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        if run.gaps.is_empty() {
            return self
                .transition(run, PipelineState::NoGapTerminal, Stage::Comparison)
                .await;
        }
        let snapshot = run.snapshot.clone().ok_or(PipelineError::Incomplete("snapshot"))?;
        progress.on_stage_start(Stage::Interpretation, run.gaps.len());

        let result = InterpretProblemsUseCase::new(self.client())
            .execute(&run.gaps, &snapshot, progress)
            .await;
        progress.on_stage_complete(Stage::Interpretation, result.is_ok());

        match result {
            Ok(problems) => {
                for problem in problems.iter().filter(|p| p.low_confidence) {
                    run.notice(
                        NoticeLevel::Warning,
                        Stage::Interpretation,
                        format!("{}: interpretation incomplete (low confidence)", problem.id),
                    );
                }
                run.problems = problems;
                self.transition(run, PipelineState::ProblemsDefined, Stage::Interpretation)
                    .await
            }
            Err(e) => {
                self.pause(run, Stage::Interpretation, &e).await;
                Ok(())
            }
        }
    }

    pub(super) async fn stage_solutions(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let focus = match run.focus() {
            Some(problem) => problem.id.clone(),
            None => select_focus(run).ok_or(PipelineError::Incomplete("problems"))?,
        };
        run.focus_problem = Some(focus);
        let problem = run
            .focus()
            .cloned()
            .ok_or(PipelineError::Incomplete("focus problem"))?;
        progress.on_stage_start(Stage::Exploration, 1);

        let result = self
            .explorer()
            .execute(ExploreInput {
                problem: &problem,
                round: 1,
                exclude: Vec::new(),
                available_tools: self.tool_names(),
            })
            .await;
        progress.on_stage_complete(Stage::Exploration, result.is_ok());

        match result {
            Ok(set) => {
                let now = self.clock.now_utc();
                if let Some(problem) = run.focus_mut() {
                    problem.transition(ProblemStatus::Proposed, now, None)?;
                }
                run.solutions = Some(set);
                self.transition(run, PipelineState::SolutionsProposed, Stage::Exploration)
                    .await
            }
            Err(e) => {
                self.pause(run, Stage::Exploration, &e).await;
                Ok(())
            }
        }
    }

    /// Rebuilds the agent of an approved solution and executes it; used when a
    /// run is resumed past composition, since agents are not persisted.
    pub(super) async fn stage_recompose(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let solution = run
            .approved()
            .cloned()
            .ok_or(PipelineError::Incomplete("approved solution"))?;
        let problem = run
            .focus()
            .cloned()
            .ok_or(PipelineError::Incomplete("focus problem"))?;

        progress.on_stage_start(Stage::Composition, 1);
        let composed = self.composer().execute(&problem, &solution).await;
        progress.on_stage_complete(Stage::Composition, composed.is_ok());

        let agent = match composed {
            Ok(agent) => agent,
            Err(e) => {
                self.pause_with(
                    run,
                    PipelineFailure::new(Stage::Composition, FailureKind::Composition, e.to_string()),
                )
                .await;
                return Ok(());
            }
        };
        info!("Recomposed agent {} for resumed run {}", agent.id, run.id);
        run.record_agent(agent.summary());
        if *run.state() == PipelineState::AgentComposed {
            self.transition(run, PipelineState::Executing, Stage::Execution)
                .await?;
        }
        self.stage_execute(run, &agent, progress).await
    }

    /// Runs `agent` over the snapshot items and moves to `Learning`.
    pub(super) async fn stage_execute(
        &self,
        run: &mut PipelineRun,
        agent: &Agent,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        if let Err(e) = check_cancelled(&self.cancellation_token) {
            self.pause(run, Stage::Execution, &e).await;
            return Ok(());
        }
        let snapshot = run.snapshot.clone().ok_or(PipelineError::Incomplete("snapshot"))?;

        for degradation in &agent.degradations {
            progress.on_degraded(Stage::Composition, &degradation.to_string());
            run.notice(
                NoticeLevel::Warning,
                Stage::Composition,
                format!("agent degraded: {}", degradation),
            );
        }

        progress.on_stage_start(Stage::Execution, snapshot.items().len());
        let result = ExecuteAgentUseCase::new(self.tools.clone(), self.params.max_concurrency)
            .execute(agent, snapshot.items(), progress)
            .await;
        progress.on_stage_complete(Stage::Execution, result.failed_count() == 0);
        self.logger.log(InferenceEvent::new(
            "agent_execution",
            json!({
                "run_id": run.id.to_string(),
                "agent_id": result.agent_id.to_string(),
                "items": result.per_item.len(),
                "succeeded": result.succeeded_count(),
                "failed": result.failed_count(),
                "acted": result.acted_count(),
            }),
        ));

        if result.failed_count() > 0 {
            warn!(
                "{} of {} items failed during execution",
                result.failed_count(),
                result.per_item.len()
            );
        }
        run.execution = Some(result);
        self.transition(run, PipelineState::Learning, Stage::Execution)
            .await
    }

    pub(super) fn composer(&self) -> ComposeAgentUseCase<G, T> {
        ComposeAgentUseCase::new(self.client(), self.tools.clone())
            .with_templates(self.templates.clone())
            .with_defaults(self.params.agent_defaults.clone())
    }

    pub(super) fn tool_names(&self) -> Vec<String> {
        self.tools
            .catalog()
            .ids()
            .map(|id| id.to_string())
            .collect()
    }
}

/// The first problem of the highest severity.
fn select_focus(run: &PipelineRun) -> Option<ProblemId> {
    run.problems
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.severity.cmp(&b.severity).then(ib.cmp(ia)))
        .map(|(_, p)| p.id.clone())
}

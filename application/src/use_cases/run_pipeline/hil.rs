//! Human-in-the-Loop methods for the RunPipeline use case.
//!
//! Contains the approval decision, feedback learning and the checkpoint loop
//! used by `run_to_completion`.

use super::RunPipelineUseCase;
use super::types::PipelineError;
use crate::ports::human_checkpoint::{ApprovalDecision, CheckpointError, HumanCheckpointPort};
use crate::ports::inference_gateway::InferenceGateway;
use crate::ports::inference_logger::InferenceEvent;
use crate::ports::progress::PipelineProgressNotifier;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::explore_solutions::ExploreInput;
use crate::use_cases::learn_outcome::{LearnOutcomeUseCase, LearningOutcome};
use gapwise_domain::{
    FailureKind, FeedbackMap, Gap, Notice, NoticeLevel, PipelineFailure, PipelineRun,
    PipelineState, ProblemStatus, SolutionArchetype, Stage,
};
use serde_json::json;
use tracing::{info, warn};

/// Consecutive composition failures tolerated before the run pauses.
const MAX_COMPOSITION_ATTEMPTS: usize = 3;

impl<G: InferenceGateway + 'static, T: ToolExecutorPort + 'static> RunPipelineUseCase<G, T> {
    /// Applies `decision`; returns the notice to show if the run is back at
    /// the approval checkpoint because composition failed.
    pub(super) async fn apply_decision(
        &self,
        run: &mut PipelineRun,
        decision: ApprovalDecision,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<Option<Notice>, PipelineError> {
        expect_state(run, PipelineState::AwaitingApproval)?;
        match decision {
            ApprovalDecision::Approve(id) => self.approve(run, id, progress).await,
            ApprovalDecision::Reject { reason } => {
                self.reject(run, reason).await?;
                Ok(None)
            }
            ApprovalDecision::RequestAlternatives => {
                self.re_explore(run, progress).await?;
                Ok(None)
            }
        }
    }

    async fn approve(
        &self,
        run: &mut PipelineRun,
        id: gapwise_domain::SolutionId,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<Option<Notice>, PipelineError> {
        let solution = run
            .solutions
            .as_ref()
            .and_then(|set| set.get(&id))
            .cloned()
            .ok_or_else(|| PipelineError::UnknownSolution(id.clone()))?;
        let problem = run
            .focus()
            .cloned()
            .ok_or(PipelineError::Incomplete("focus problem"))?;
        info!("Solution '{}' approved", solution.name);
        self.logger.log(InferenceEvent::new(
            "solution_decision",
            json!({
                "run_id": run.id.to_string(),
                "decision": "approve",
                "solution_id": id.to_string(),
                "solution": solution.name,
            }),
        ));

        progress.on_stage_start(Stage::Composition, 1);
        let composed = self.composer().execute(&problem, &solution).await;
        progress.on_stage_complete(Stage::Composition, composed.is_ok());

        let agent = match composed {
            Ok(agent) => agent,
            Err(e) => {
                warn!("Composition of '{}' failed: {}", solution.name, e);
                let message = format!("composition of '{}' failed: {}", solution.name, e);
                run.notice(NoticeLevel::Error, Stage::Composition, message.clone());
                let failures = run
                    .notices
                    .iter()
                    .rev()
                    .take_while(|n| n.stage == Stage::Composition && n.level == NoticeLevel::Error)
                    .count();
                if failures >= MAX_COMPOSITION_ATTEMPTS {
                    self.pause_with(
                        run,
                        PipelineFailure::new(Stage::Composition, FailureKind::Composition, message),
                    )
                    .await;
                    return Ok(None);
                }
                self.save(run, Stage::Composition).await;
                return Ok(run.notices.last().cloned());
            }
        };

        let now = self.clock.now_utc();
        if let Some(problem) = run.focus_mut() {
            problem.transition(ProblemStatus::Confirmed, now, Some(solution.name.clone()))?;
        }
        run.approved_solution = Some(id);
        run.record_agent(agent.summary());
        self.transition(run, PipelineState::AgentComposed, Stage::Composition)
            .await?;
        self.transition(run, PipelineState::Executing, Stage::Execution)
            .await?;
        self.stage_execute(run, &agent, progress).await?;
        Ok(None)
    }

    async fn reject(&self, run: &mut PipelineRun, reason: String) -> Result<(), PipelineError> {
        let snapshot = run.snapshot.clone().ok_or(PipelineError::Incomplete("snapshot"))?;
        let archetype = run
            .solutions
            .as_ref()
            .and_then(|set| set.recommended())
            .map(|s| s.archetype())
            .unwrap_or_else(|| SolutionArchetype::Other("generic".to_string()));
        info!("Solutions rejected: {}", reason);
        self.logger.log(InferenceEvent::new(
            "solution_decision",
            json!({
                "run_id": run.id.to_string(),
                "decision": "reject",
                "reason": reason,
            }),
        ));

        let now = self.clock.now_utc();
        if let Some(problem) = run.focus_mut() {
            problem.transition(ProblemStatus::Rejected, now, Some(reason.clone()))?;
        }
        run.rejection = Some(reason.clone());
        self.transition(run, PipelineState::Learning, Stage::Checkpoint)
            .await?;

        let gap = focus_gap(run);
        let outcome = self
            .learner()
            .learn_rejection(&snapshot, gap.as_ref(), &archetype, &reason, now)
            .await;
        self.record_learning(run, outcome);
        self.transition(run, PipelineState::Idle, Stage::Learning)
            .await
    }

    async fn re_explore(
        &self,
        run: &mut PipelineRun,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let current = run
            .solutions
            .clone()
            .ok_or(PipelineError::Incomplete("solutions"))?;
        let problem = run
            .focus()
            .cloned()
            .ok_or(PipelineError::Incomplete("focus problem"))?;
        let round = current.round + 1;
        info!("Alternatives requested; exploring round {}", round);
        self.logger.log(InferenceEvent::new(
            "solution_decision",
            json!({
                "run_id": run.id.to_string(),
                "decision": "request_alternatives",
                "round": round,
            }),
        ));

        let mut exclude = run.excluded_solutions.clone();
        for name in current.names() {
            if !exclude.contains(&name) {
                exclude.push(name);
            }
        }

        progress.on_stage_start(Stage::Exploration, 1);
        let result = self
            .explorer()
            .execute(ExploreInput {
                problem: &problem,
                round,
                exclude: exclude.clone(),
                available_tools: self.tool_names(),
            })
            .await;
        progress.on_stage_complete(Stage::Exploration, result.is_ok());

        match result {
            Ok(set) => {
                let now = self.clock.now_utc();
                if let Some(problem) = run.focus_mut() {
                    problem.transition(
                        ProblemStatus::Proposed,
                        now,
                        Some("alternatives requested".to_string()),
                    )?;
                }
                run.solutions = Some(set);
                run.excluded_solutions = exclude;
                run.approved_solution = None;
                self.transition(run, PipelineState::SolutionsProposed, Stage::Exploration)
                    .await?;
                self.transition(run, PipelineState::AwaitingApproval, Stage::Checkpoint)
                    .await
            }
            Err(e) => {
                // Resuming returns to the approval checkpoint with the old set
                self.pause(run, Stage::Exploration, &e).await;
                Ok(())
            }
        }
    }

    /// Folds `feedback` on the execution into the world model and returns to `Idle`.
    pub(super) async fn apply_feedback(
        &self,
        run: &mut PipelineRun,
        feedback: FeedbackMap,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        expect_state(run, PipelineState::Learning)?;
        let snapshot = run.snapshot.clone().ok_or(PipelineError::Incomplete("snapshot"))?;
        let result = run
            .execution
            .clone()
            .ok_or(PipelineError::Incomplete("execution result"))?;

        progress.on_stage_start(Stage::Learning, 1);
        let now = self.clock.now_utc();
        let gap = focus_gap(run);
        let outcome = self
            .learner()
            .learn_execution(&snapshot, gap.as_ref(), &result, &feedback, now)
            .await;
        progress.on_stage_complete(Stage::Learning, outcome.persistence_error.is_none());

        run.feedback = Some(feedback);
        self.record_learning(run, outcome);
        if let Some(problem) = run.focus_mut()
            && problem.status == ProblemStatus::Confirmed
        {
            problem.transition(ProblemStatus::Archived, now, None)?;
        }
        self.transition(run, PipelineState::Idle, Stage::Learning)
            .await?;
        info!("Run {} complete", run.id);
        Ok(())
    }

    /// Advances `run` and answers every checkpoint through `checkpoint` until
    /// the run completes or pauses.
    pub(super) async fn drive(
        &self,
        run: &mut PipelineRun,
        checkpoint: &dyn HumanCheckpointPort,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<(), PipelineError> {
        let mut notice: Option<Notice> = None;
        loop {
            self.advance(run, progress).await?;

            match run.state().clone() {
                PipelineState::AwaitingApproval => {
                    let problem = run
                        .focus()
                        .cloned()
                        .ok_or(PipelineError::Incomplete("focus problem"))?;
                    let solutions = run
                        .solutions
                        .clone()
                        .ok_or(PipelineError::Incomplete("solutions"))?;
                    let decision = checkpoint
                        .review_solutions(&problem, &solutions, notice.as_ref())
                        .await;
                    match decision {
                        Ok(decision) => {
                            notice = self.apply_decision(run, decision, progress).await?;
                        }
                        Err(e) => self.pause_for_checkpoint(run, e).await,
                    }
                }
                PipelineState::Learning => {
                    let result = run
                        .execution
                        .clone()
                        .ok_or(PipelineError::Incomplete("execution result"))?;
                    match checkpoint.collect_feedback(&result).await {
                        Ok(feedback) => self.apply_feedback(run, feedback, progress).await?,
                        Err(e) => self.pause_for_checkpoint(run, e).await,
                    }
                }
                PipelineState::Paused { failure, .. } => {
                    checkpoint.on_paused(&failure);
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
    }

    async fn pause_for_checkpoint(&self, run: &mut PipelineRun, error: CheckpointError) {
        let kind = match error {
            CheckpointError::Cancelled => FailureKind::Cancelled,
            _ => FailureKind::Checkpoint,
        };
        self.pause_with(
            run,
            PipelineFailure::new(Stage::Checkpoint, kind, error.to_string()),
        )
        .await;
    }

    fn learner(&self) -> LearnOutcomeUseCase {
        LearnOutcomeUseCase::new(self.world.clone(), self.store.clone())
            .with_policy(self.params.learning)
    }

    fn record_learning(&self, run: &mut PipelineRun, outcome: LearningOutcome) {
        if let Some(e) = outcome.persistence_error {
            run.notice(
                NoticeLevel::Error,
                Stage::Learning,
                format!("persistence_error: world model not saved: {}", e),
            );
        }
        run.learning = Some(outcome.report);
    }
}

fn expect_state(run: &PipelineRun, expected: PipelineState) -> Result<(), PipelineError> {
    if *run.state() == expected {
        Ok(())
    } else {
        Err(PipelineError::InvalidState {
            expected: expected.as_str(),
            actual: run.state().as_str().to_string(),
        })
    }
}

/// The gap behind the focus problem.
fn focus_gap(run: &PipelineRun) -> Option<Gap> {
    let problem = run.focus()?;
    run.gaps.iter().find(|g| g.id == problem.gap_id).cloned()
}

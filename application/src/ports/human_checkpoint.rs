//! Human checkpoint port.
//!
//! The pipeline stops twice for a human: to approve one of the proposed
//! solutions, and to give feedback on what the composed agent did.
//!
//! # Built-in Implementations
//!
//! - [`AutoApproveCheckpoint`] - approves the recommended solution and
//!   confirms every succeeded item
//! - [`AutoRejectCheckpoint`] - rejects every proposal
//!
//! For interactive use, see `InteractiveCheckpoint` in the presentation layer.

use async_trait::async_trait;
use gapwise_domain::{
    ExecutionResult, FeedbackMap, Notice, PipelineFailure, Problem, SolutionId, SolutionSet,
};
use thiserror::Error;

/// The human's answer at the approval checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalDecision {
    Approve(SolutionId),
    Reject { reason: String },
    /// Discard the current set and explore new solutions.
    RequestAlternatives,
}

/// Failures of the checkpoint itself, not decisions made by the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckpointError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[async_trait]
pub trait HumanCheckpointPort: Send + Sync {
    /// Ask the human to pick, reject, or replace the proposed solutions.
    ///
    /// `notice` carries the reason the checkpoint is shown again (for example
    /// a composition error for the previously approved solution).
    async fn review_solutions(
        &self,
        problem: &Problem,
        solutions: &SolutionSet,
        notice: Option<&Notice>,
    ) -> Result<ApprovalDecision, CheckpointError>;

    /// Collect per-item feedback on an execution. No feedback by default.
    async fn collect_feedback(
        &self,
        _result: &ExecutionResult,
    ) -> Result<FeedbackMap, CheckpointError> {
        Ok(FeedbackMap::new())
    }

    /// Called when the run pauses on a failure.
    fn on_paused(&self, _failure: &PipelineFailure) {}
}

/// Approves the recommended solution without asking.
pub struct AutoApproveCheckpoint;

#[async_trait]
impl HumanCheckpointPort for AutoApproveCheckpoint {
    async fn review_solutions(
        &self,
        _problem: &Problem,
        solutions: &SolutionSet,
        _notice: Option<&Notice>,
    ) -> Result<ApprovalDecision, CheckpointError> {
        Ok(match solutions.recommended() {
            Some(solution) => ApprovalDecision::Approve(solution.id.clone()),
            None => ApprovalDecision::Reject {
                reason: "no solution to approve".to_string(),
            },
        })
    }

    async fn collect_feedback(
        &self,
        result: &ExecutionResult,
    ) -> Result<FeedbackMap, CheckpointError> {
        Ok(FeedbackMap::confirm_all(
            result
                .per_item
                .iter()
                .filter(|o| o.succeeded)
                .map(|o| o.item_ref.clone()),
        ))
    }
}

/// Rejects every proposal; the safest non-interactive mode.
pub struct AutoRejectCheckpoint;

#[async_trait]
impl HumanCheckpointPort for AutoRejectCheckpoint {
    async fn review_solutions(
        &self,
        _problem: &Problem,
        _solutions: &SolutionSet,
        _notice: Option<&Notice>,
    ) -> Result<ApprovalDecision, CheckpointError> {
        Ok(ApprovalDecision::Reject {
            reason: "auto-rejected".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapwise_domain::{
        AgentId, Complexity, ExecutionFailure, Gap, ItemOutcome, ProblemAnalysis, ProblemId,
        Severity, Solution,
    };

    fn problem() -> Problem {
        Problem::from_analysis(
            &Gap::new("gap-1", "unread exceeds ideal by 3", Severity::High),
            ProblemAnalysis::default(),
        )
    }

    fn solutions() -> SolutionSet {
        SolutionSet::new(
            ProblemId::new("problem-gap-1"),
            1,
            vec![
                Solution::new("s1", "Rewrite everything", "big").with_complexity(Complexity::High),
                Solution::new("s2", "Priority filter", "small").with_complexity(Complexity::Low),
            ],
        )
    }

    #[tokio::test]
    async fn test_auto_approve_picks_recommended() {
        let decision = AutoApproveCheckpoint
            .review_solutions(&problem(), &solutions(), None)
            .await
            .unwrap();
        assert_eq!(decision, ApprovalDecision::Approve(SolutionId::new("s2")));
    }

    #[tokio::test]
    async fn test_auto_approve_confirms_succeeded_items() {
        let result = ExecutionResult::new(
            AgentId::new("agent-1"),
            vec![
                ItemOutcome::applied("m1", "skip".into(), vec![]),
                ItemOutcome::failed(
                    "m2",
                    ExecutionFailure::NoMatchingTransition {
                        node: "decide".into(),
                    },
                    vec![],
                ),
            ],
        );
        let feedback = AutoApproveCheckpoint.collect_feedback(&result).await.unwrap();
        assert_eq!(feedback.len(), 1);
        assert!(feedback.get("m1").is_some());
    }

    #[tokio::test]
    async fn test_auto_reject() {
        let decision = AutoRejectCheckpoint
            .review_solutions(&problem(), &solutions(), None)
            .await
            .unwrap();
        assert!(matches!(decision, ApprovalDecision::Reject { .. }));
        let feedback = AutoRejectCheckpoint
            .collect_feedback(&ExecutionResult::new(AgentId::new("a"), vec![]))
            .await
            .unwrap();
        assert!(feedback.is_empty());
    }
}

//! Pipeline state machine.
//!
//! ```text
//! Idle -> SnapshotReady -> ExpectationReady -> GapsDetected -> ProblemsDefined
//!      -> SolutionsProposed -> AwaitingApproval -> AgentComposed -> Executing
//!      -> Learning -> Idle
//!
//! GapsDetected     -> NoGapTerminal            (zero gaps)
//! AwaitingApproval -> Learning                 (reject)
//! AwaitingApproval -> SolutionsProposed        (request alternatives)
//! any              -> Paused { resume_from }   (unrecoverable stage failure)
//! ```

use serde::{Deserialize, Serialize};

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Snapshot,
    Expectation,
    Comparison,
    Interpretation,
    Exploration,
    Composition,
    Execution,
    Learning,
    Checkpoint,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Snapshot => "snapshot",
            Stage::Expectation => "expectation",
            Stage::Comparison => "comparison",
            Stage::Interpretation => "interpretation",
            Stage::Exploration => "exploration",
            Stage::Composition => "composition",
            Stage::Execution => "execution",
            Stage::Learning => "learning",
            Stage::Checkpoint => "checkpoint",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Snapshot => "Context Snapshot",
            Stage::Expectation => "Expectation Synthesis",
            Stage::Comparison => "Gap Comparison",
            Stage::Interpretation => "Problem Interpretation",
            Stage::Exploration => "Solution Exploration",
            Stage::Composition => "Agent Composition",
            Stage::Execution => "Agent Execution",
            Stage::Learning => "Outcome Learning",
            Stage::Checkpoint => "Human Checkpoint",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ExpectationUnavailable,
    InferenceMalformed,
    InferenceTimeout,
    Gateway,
    NoSolutions,
    Composition,
    Checkpoint,
    Cancelled,
}

/// Structured error surfaced to the human checkpoint when a run pauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

impl PipelineFailure {
    pub fn new(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    SnapshotReady,
    ExpectationReady,
    GapsDetected,
    ProblemsDefined,
    SolutionsProposed,
    AwaitingApproval,
    AgentComposed,
    Executing,
    Learning,
    NoGapTerminal,
    Paused {
        resume_from: Box<PipelineState>,
        failure: PipelineFailure,
    },
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::SnapshotReady => "snapshot_ready",
            PipelineState::ExpectationReady => "expectation_ready",
            PipelineState::GapsDetected => "gaps_detected",
            PipelineState::ProblemsDefined => "problems_defined",
            PipelineState::SolutionsProposed => "solutions_proposed",
            PipelineState::AwaitingApproval => "awaiting_approval",
            PipelineState::AgentComposed => "agent_composed",
            PipelineState::Executing => "executing",
            PipelineState::Learning => "learning",
            PipelineState::NoGapTerminal => "no_gap_terminal",
            PipelineState::Paused { .. } => "paused",
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PipelineState::Paused { .. })
    }

    /// States that wait on a human decision rather than advancing on their own.
    pub fn is_checkpoint(&self) -> bool {
        matches!(
            self,
            PipelineState::AwaitingApproval | PipelineState::Learning
        )
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Paused` is reachable from every non-paused state; leaving `Paused` goes
    /// through [`crate::PipelineRun::resume`], not through this table.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        if next.is_paused() {
            return !self.is_paused();
        }
        matches!(
            (self, next),
            (Idle, SnapshotReady)
                | (SnapshotReady, ExpectationReady)
                | (ExpectationReady, GapsDetected)
                | (GapsDetected, ProblemsDefined)
                | (GapsDetected, NoGapTerminal)
                | (ProblemsDefined, SolutionsProposed)
                | (SolutionsProposed, AwaitingApproval)
                | (AwaitingApproval, AgentComposed)
                | (AwaitingApproval, Learning)
                | (AwaitingApproval, SolutionsProposed)
                | (AgentComposed, Executing)
                | (Executing, Learning)
                | (Learning, Idle)
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            Idle,
            SnapshotReady,
            ExpectationReady,
            GapsDetected,
            ProblemsDefined,
            SolutionsProposed,
            AwaitingApproval,
            AgentComposed,
            Executing,
            Learning,
            Idle,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(&pair[1]),
                "{} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_only_reexploration_goes_backwards() {
        assert!(AwaitingApproval.can_transition_to(&SolutionsProposed));
        assert!(!AgentComposed.can_transition_to(&AwaitingApproval));
        assert!(!Learning.can_transition_to(&Executing));
        assert!(!GapsDetected.can_transition_to(&SolutionsProposed));
        assert!(!NoGapTerminal.can_transition_to(&ProblemsDefined));
    }

    #[test]
    fn test_pause_reachable_from_any_unpaused_state() {
        let paused = Paused {
            resume_from: Box::new(ExpectationReady),
            failure: PipelineFailure::new(Stage::Comparison, FailureKind::InferenceTimeout, "t"),
        };
        assert!(Idle.can_transition_to(&paused));
        assert!(Executing.can_transition_to(&paused));
        assert!(!paused.can_transition_to(&paused));
    }

    #[test]
    fn test_state_serde_is_tagged() {
        let paused = Paused {
            resume_from: Box::new(SnapshotReady),
            failure: PipelineFailure::new(
                Stage::Expectation,
                FailureKind::ExpectationUnavailable,
                "bad",
            ),
        };
        let json = serde_json::to_value(&paused).unwrap();
        assert_eq!(json["state"], "paused");
        assert_eq!(json["resume_from"]["state"], "snapshot_ready");
        let back: PipelineState = serde_json::from_value(json).unwrap();
        assert_eq!(back, paused);
    }
}

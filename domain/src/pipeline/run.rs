//! The persisted record of one pipeline run.
//!
//! A [`PipelineRun`] carries everything needed to resume after a process
//! restart: the current [`PipelineState`] plus every value object produced so
//! far. Agents themselves are not persisted, only their summary; resuming
//! at `AgentComposed`/`Executing` recomposes from the approved solution.

use crate::agent::entities::AgentSummary;
use crate::context::snapshot::ContextSnapshot;
use crate::core::error::DomainError;
use crate::core::ids::{AgentId, ProblemId, RunId, SolutionId};
use crate::execution::result::ExecutionResult;
use crate::learning::feedback::FeedbackMap;
use crate::learning::report::LearningReport;
use crate::pipeline::expectation::Expectation;
use crate::pipeline::gap::Gap;
use crate::pipeline::problem::Problem;
use crate::pipeline::solution::{Solution, SolutionSet};
use crate::pipeline::state::{PipelineFailure, PipelineState, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Something the UI should surface: a degradation, a rejected composition, a
/// failed save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    state: PipelineState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snapshot: Option<ContextSnapshot>,
    #[serde(default)]
    pub expectation: Option<Expectation>,
    #[serde(default)]
    pub gaps: Vec<Gap>,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub focus_problem: Option<ProblemId>,
    #[serde(default)]
    pub solutions: Option<SolutionSet>,
    /// Names from every set replaced by a request for alternatives.
    #[serde(default)]
    pub excluded_solutions: Vec<String>,
    #[serde(default)]
    pub approved_solution: Option<SolutionId>,
    #[serde(default)]
    pub agent: Option<AgentSummary>,
    #[serde(default)]
    pub superseded_agents: Vec<AgentId>,
    #[serde(default)]
    pub execution: Option<ExecutionResult>,
    #[serde(default)]
    pub feedback: Option<FeedbackMap>,
    #[serde(default)]
    pub rejection: Option<String>,
    #[serde(default)]
    pub learning: Option<LearningReport>,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

impl PipelineRun {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_id(RunId::generate(), now)
    }

    pub fn with_id(id: RunId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: PipelineState::Idle,
            started_at: now,
            updated_at: now,
            completed_at: None,
            snapshot: None,
            expectation: None,
            gaps: Vec::new(),
            problems: Vec::new(),
            focus_problem: None,
            solutions: None,
            excluded_solutions: Vec::new(),
            approved_solution: None,
            agent: None,
            superseded_agents: Vec::new(),
            execution: None,
            feedback: None,
            rejection: None,
            learning: None,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Moves to `next` if the state machine allows it.
    pub fn transition(&mut self, next: PipelineState, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.state.can_transition_to(&next) {
            return Err(DomainError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        if next == PipelineState::Idle {
            self.completed_at = Some(now);
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// Pauses the run, remembering the current state as the last good one.
    ///
    /// Pausing an already paused run only replaces the failure.
    pub fn pause(&mut self, failure: PipelineFailure, now: DateTime<Utc>) {
        let resume_from = match std::mem::replace(&mut self.state, PipelineState::Idle) {
            PipelineState::Paused { resume_from, .. } => resume_from,
            other => Box::new(other),
        };
        self.state = PipelineState::Paused {
            resume_from,
            failure,
        };
        self.updated_at = now;
    }

    /// Leaves `Paused`, restoring the last good state. Returns the cleared failure.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<PipelineFailure, DomainError> {
        match std::mem::replace(&mut self.state, PipelineState::Idle) {
            PipelineState::Paused {
                resume_from,
                failure,
            } => {
                self.state = *resume_from;
                self.updated_at = now;
                Ok(failure)
            }
            other => {
                self.state = other;
                Err(DomainError::NotPaused)
            }
        }
    }

    pub fn failure(&self) -> Option<&PipelineFailure> {
        match &self.state {
            PipelineState::Paused { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Finished runs: no gaps, or learned and back to idle.
    pub fn is_complete(&self) -> bool {
        match self.state {
            PipelineState::NoGapTerminal => true,
            PipelineState::Idle => self.completed_at.is_some(),
            _ => false,
        }
    }

    pub fn focus(&self) -> Option<&Problem> {
        let id = self.focus_problem.as_ref()?;
        self.problems.iter().find(|p| &p.id == id)
    }

    pub fn focus_mut(&mut self) -> Option<&mut Problem> {
        let id = self.focus_problem.clone()?;
        self.problems.iter_mut().find(|p| p.id == id)
    }

    pub fn approved(&self) -> Option<&Solution> {
        let id = self.approved_solution.as_ref()?;
        self.solutions.as_ref()?.get(id)
    }

    /// Records a newly composed agent, superseding any earlier one.
    pub fn record_agent(&mut self, summary: AgentSummary) {
        if let Some(previous) = self.agent.replace(summary) {
            self.superseded_agents.push(previous.id);
        }
    }

    pub fn notice(&mut self, level: NoticeLevel, stage: Stage, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            stage,
            message: message.into(),
        });
    }
}

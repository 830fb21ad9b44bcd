//! Problems interpreted from gaps, with their review lifecycle.

use crate::core::error::DomainError;
use crate::core::ids::{GapId, ProblemId};
use crate::pipeline::gap::{Gap, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review status of a problem.
///
/// ```text
/// candidate -> proposed -> confirmed -> archived
///                       \-> rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    #[default]
    Candidate,
    Proposed,
    Confirmed,
    Rejected,
    Archived,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Candidate => "candidate",
            ProblemStatus::Proposed => "proposed",
            ProblemStatus::Confirmed => "confirmed",
            ProblemStatus::Rejected => "rejected",
            ProblemStatus::Archived => "archived",
        }
    }

    pub fn can_transition_to(&self, next: ProblemStatus) -> bool {
        use ProblemStatus::*;
        matches!(
            (self, next),
            (Candidate, Proposed)
                | (Proposed, Proposed)
                | (Proposed, Confirmed)
                | (Proposed, Rejected)
                | (Confirmed, Archived)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: ProblemStatus,
    pub to: ProblemStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Cause/impact analysis as returned by the interpreter, before placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemAnalysis {
    pub name: String,
    #[serde(alias = "description")]
    pub detail: String,
    pub cause: String,
    #[serde(alias = "impact_if_unresolved")]
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub gap_id: GapId,
    pub name: String,
    pub detail: String,
    pub cause: String,
    pub impact: String,
    pub severity: Severity,
    #[serde(default)]
    pub related_items: Vec<String>,
    /// Set when cause or impact had to be filled with a placeholder.
    #[serde(default)]
    pub low_confidence: bool,
    #[serde(default)]
    pub status: ProblemStatus,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl Problem {
    /// Placeholder used for missing cause or impact.
    pub const UNKNOWN: &'static str = "unknown";

    /// Builds the problem for `gap`, substituting placeholders for an
    /// incomplete analysis.
    pub fn from_analysis(gap: &Gap, analysis: ProblemAnalysis) -> Self {
        let fill = |value: String| -> (String, bool) {
            if value.trim().is_empty() {
                (Self::UNKNOWN.to_string(), true)
            } else {
                (value.trim().to_string(), false)
            }
        };
        let (cause, cause_missing) = fill(analysis.cause);
        let (impact, impact_missing) = fill(analysis.impact);
        let name = if analysis.name.trim().is_empty() {
            gap.description.clone()
        } else {
            analysis.name.trim().to_string()
        };
        let detail = if analysis.detail.trim().is_empty() {
            gap.description.clone()
        } else {
            analysis.detail.trim().to_string()
        };

        Self {
            id: Self::id_for(&gap.id),
            gap_id: gap.id.clone(),
            name,
            detail,
            cause,
            impact,
            severity: gap.severity,
            related_items: gap.related_items.clone(),
            low_confidence: cause_missing || impact_missing,
            status: ProblemStatus::Candidate,
            history: Vec::new(),
        }
    }

    pub fn id_for(gap_id: &GapId) -> ProblemId {
        ProblemId::new(format!("problem-{}", gap_id))
    }

    /// Moves the problem to `next`, recording the change.
    pub fn transition(
        &mut self,
        next: ProblemStatus,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidProblemTransition {
                problem: self.id.to_string(),
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.history.push(StatusChange {
            from: self.status,
            to: next,
            at,
            reason,
        });
        self.status = next;
        Ok(())
    }
}

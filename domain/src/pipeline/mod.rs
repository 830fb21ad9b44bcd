//! Pipeline value objects and the run state machine

pub mod expectation;
pub mod gap;
pub mod problem;
pub mod run;
pub mod solution;
pub mod state;

pub use expectation::{Criterion, Expectation};
pub use gap::{Gap, Severity, rank_gaps};
pub use problem::{Problem, ProblemAnalysis, ProblemStatus, StatusChange};
pub use run::{Notice, NoticeLevel, PipelineRun};
pub use solution::{Complexity, Solution, SolutionArchetype, SolutionSet};
pub use state::{FailureKind, PipelineFailure, PipelineState, Stage};

//! Use cases
//!
//! One use case per pipeline stage, plus [`run_pipeline`] which drives them
//! through the state machine.

pub mod build_snapshot;
pub mod compare_gaps;
pub mod compose_agent;
pub mod execute_agent;
pub mod explore_solutions;
pub mod interpret_problems;
pub mod learn_outcome;
pub mod run_pipeline;
pub mod shared;
pub mod synthesize_expectation;

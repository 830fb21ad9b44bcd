//! Domain layer for gapwise
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## World model
//!
//! The user's goals, preferences, behavioral patterns and declared ideal
//! states. It drives every run and is updated by the learner at the end.
//!
//! ## The pipeline
//!
//! snapshot → expectation → gaps → problems → solutions → (human approval)
//! → agent → execution → learning. [`PipelineRun`] records a run and
//! [`PipelineState`] enforces the legal transitions between stages.
//!
//! ## Agents as data
//!
//! An approved solution is composed into an [`Agent`]: a validated
//! analyze → decide → act [`AgentGraph`] over bound tools. Missing tools
//! degrade the agent instead of failing composition.

pub mod agent;
pub mod config;
pub mod context;
pub mod core;
pub mod execution;
pub mod inference;
pub mod learning;
pub mod pipeline;
pub mod prompt;
pub mod tool;
pub mod world;

// Re-export commonly used types
pub use agent::{
    Agent, AgentAction, AgentGraph, AgentParameters, AgentState, AgentSummary, AgentTemplate,
    Degradation, EdgeCondition, GraphValidationError, NodeKind, ParameterOverrides,
    TemplateRegistry,
};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat};
pub use context::{ContextSnapshot, Observation, SensedItem, TemporalContext};
pub use core::{
    error::DomainError,
    ids::{AgentId, GapId, NodeId, ProblemId, RunId, SolutionId, ToolId},
};
pub use execution::{ExecutionFailure, ExecutionResult, ItemOutcome};
pub use inference::{InferenceRequest, OutputSchema, ParseError};
pub use learning::{Feedback, FeedbackMap, LearningPolicy, LearningReport, ThresholdAdjustment};
pub use pipeline::{
    Complexity, Criterion, Expectation, FailureKind, Gap, Notice, NoticeLevel, PipelineFailure,
    PipelineRun, PipelineState, Problem, ProblemAnalysis, ProblemStatus, Severity, Solution,
    SolutionArchetype, SolutionSet, Stage, rank_gaps,
};
pub use prompt::PromptTemplate;
pub use tool::{ToolCall, ToolCatalog, ToolDefinition, ToolKind, ToolOutput};
pub use world::{
    Comparison, Goal, GoalPriority, HourBucket, IdealState, PatternEntry, PatternKey, Profile,
    WorldModel,
};

//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid problem status transition for {problem}: {from} -> {to}")]
    InvalidProblemTransition {
        problem: String,
        from: String,
        to: String,
    },

    #[error("Unknown solution: {0}")]
    UnknownSolution(String),

    #[error("Invalid pattern key: {0}")]
    InvalidPatternKey(String),

    #[error("Run is not paused")]
    NotPaused,

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

//! Tool implementations for composed agents
//!
//! The builtin tools work on the sensed item they are handed: they read its
//! fields, score and classify it with keyword heuristics, and record the
//! effects of acting on it. Effects are returned rather than performed.

mod executor;
mod heuristics;

pub use executor::BuiltinToolExecutor;

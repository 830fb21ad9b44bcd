//! World model: profile, goals, preferences, patterns and ideal states

pub mod entities;
pub mod pattern;

pub use entities::{Comparison, Goal, GoalPriority, IdealState, Profile, WorldModel};
pub use pattern::{HourBucket, PatternEntry, PatternKey, weekday_name};

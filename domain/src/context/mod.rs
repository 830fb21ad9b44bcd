//! Sensed context: items, snapshot and derived metrics

pub mod metrics;
pub mod snapshot;

pub use metrics::{Observation, observe_criteria};
pub use snapshot::{ContextSnapshot, SensedItem, TemporalContext};

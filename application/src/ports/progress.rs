//! Progress notification port
//!
//! Defines the interface for reporting progress during a pipeline run.

use gapwise_domain::Stage;

/// Callback for progress updates during a run
///
/// Implementations live in the presentation layer.
pub trait PipelineProgressNotifier: Send + Sync {
    /// Called when a stage starts; `total` is the number of work units
    /// (gaps, items) or 1 for single-call stages.
    fn on_stage_start(&self, stage: Stage, total: usize);

    fn on_stage_complete(&self, stage: Stage, success: bool);

    /// Called per processed unit within a stage.
    fn on_item_processed(&self, _stage: Stage, _item: &str, _success: bool) {}

    /// Called when a stage continues with reduced capability.
    fn on_degraded(&self, _stage: Stage, _message: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgressNotifier for NoProgress {
    fn on_stage_start(&self, _stage: Stage, _total: usize) {}
    fn on_stage_complete(&self, _stage: Stage, _success: bool) {}
}

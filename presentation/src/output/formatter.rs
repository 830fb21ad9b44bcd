//! Output formatter trait

use gapwise_domain::{OutputFormat, PipelineRun};

/// Trait for formatting pipeline runs
pub trait OutputFormatter {
    /// Every stage of the run
    fn format_full(&self, run: &PipelineRun) -> String;

    /// The run record as JSON
    fn format_json(&self, run: &PipelineRun) -> String;

    /// Gap, decision and outcome only
    fn format_summary(&self, run: &PipelineRun) -> String;

    fn format(&self, run: &PipelineRun, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => self.format_full(run),
            OutputFormat::Summary => self.format_summary(run),
            OutputFormat::Json => self.format_json(run),
        }
    }
}

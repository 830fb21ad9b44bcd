//! Progress reporting for pipeline runs

use colored::Colorize;
use gapwise_application::PipelineProgressNotifier;
use gapwise_domain::Stage;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress during a run with one bar per stage
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.stage_bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgressNotifier for ProgressReporter {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::stage_style());
        pb.set_prefix(stage.display_name());
        pb.set_message("Starting...");

        if let Ok(mut guard) = self.stage_bar.lock() {
            // A stage that never completed (pause, cancel) leaves its bar behind
            if let Some(stale) = guard.replace(pb) {
                stale.abandon();
            }
        }
    }

    fn on_item_processed(&self, _stage: Stage, item: &str, success: bool) {
        self.with_bar(|pb| {
            let status = if success {
                format!("{} {}", "v".green(), item)
            } else {
                format!("{} {}", "x".red(), item)
            };
            pb.set_message(status);
            pb.inc(1);
        });
    }

    fn on_degraded(&self, _stage: Stage, message: &str) {
        self.with_bar(|pb| pb.println(format!("  {} {}", "!".yellow(), message)));
    }

    fn on_stage_complete(&self, stage: Stage, success: bool) {
        let Ok(mut guard) = self.stage_bar.lock() else {
            return;
        };
        if let Some(pb) = guard.take() {
            if success {
                pb.set_position(pb.length().unwrap_or(0));
                pb.finish_with_message(format!("{} complete", stage.as_str().green()));
            } else {
                pb.abandon_with_message(format!("{} failed", stage.as_str().red()));
            }
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl PipelineProgressNotifier for SimpleProgress {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        println!(
            "{} {} ({} units)",
            "->".cyan(),
            stage.display_name().bold(),
            total
        );
    }

    fn on_item_processed(&self, _stage: Stage, item: &str, success: bool) {
        if success {
            println!("  {} {}", "v".green(), item);
        } else {
            println!("  {} {} (failed)", "x".red(), item);
        }
    }

    fn on_degraded(&self, _stage: Stage, message: &str) {
        println!("  {} {}", "!".yellow(), message);
    }

    fn on_stage_complete(&self, _stage: Stage, _success: bool) {}
}

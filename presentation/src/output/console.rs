//! Console output formatter for pipeline runs

use crate::output::formatter::OutputFormatter;
use colored::{ColoredString, Colorize};
use gapwise_domain::{NoticeLevel, PipelineRun, PipelineState, Severity};

/// Formats pipeline runs for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format every stage of the run
    pub fn format_full(run: &PipelineRun) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("gapwise run"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Run:".cyan().bold(), run.id));
        output.push_str(&format!("{} {}\n", "State:".cyan().bold(), Self::state(run)));

        if let Some(snapshot) = &run.snapshot {
            output.push_str(&Self::section_header("Snapshot"));
            output.push_str(&format!(
                "{} items at {}{}\n",
                snapshot.items().len(),
                snapshot.current_time().format("%Y-%m-%d %H:%M %:z"),
                if snapshot.data_unavailable() {
                    format!(" {}", "(data unavailable)".yellow())
                } else {
                    String::new()
                }
            ));
        }

        if let Some(expectation) = &run.expectation {
            output.push_str(&Self::section_header("Expectation"));
            if !expectation.ideal_description.is_empty() {
                output.push_str(&format!("{}\n", expectation.ideal_description));
            }
            for criterion in &expectation.criteria {
                output.push_str(&format!(
                    "  * {}{} {} {}\n",
                    criterion.domain,
                    criterion
                        .condition
                        .as_deref()
                        .map(|c| format!("/{}", c))
                        .unwrap_or_default(),
                    criterion.comparison.as_str(),
                    criterion.target_value
                ));
            }
        }

        if !run.gaps.is_empty() {
            output.push_str(&Self::section_header("Gaps"));
            for gap in &run.gaps {
                output.push_str(&format!(
                    "  [{}] {} ({} items)\n",
                    Self::severity(gap.severity),
                    gap.description,
                    gap.related_items.len()
                ));
            }
        }

        if !run.problems.is_empty() {
            output.push_str(&Self::section_header("Problems"));
            for problem in &run.problems {
                let focus = if run.focus_problem.as_ref() == Some(&problem.id) {
                    format!(" {}", "(focus)".green())
                } else {
                    String::new()
                };
                output.push_str(&format!(
                    "\n{}{}\n",
                    format!("── {} [{}] ──", problem.name, problem.status.as_str())
                        .yellow()
                        .bold(),
                    focus
                ));
                output.push_str(&format!("  Cause:  {}\n", problem.cause));
                output.push_str(&format!("  Impact: {}\n", problem.impact));
                if problem.low_confidence {
                    output.push_str(&format!("  {}\n", "low confidence".dimmed()));
                }
            }
        }

        if let Some(solutions) = &run.solutions {
            output.push_str(&Self::section_header(&format!(
                "Solutions (round {})",
                solutions.round
            )));
            for (i, solution) in solutions.solutions.iter().enumerate() {
                let approved = if run.approved_solution.as_ref() == Some(&solution.id) {
                    format!(" {}", "(approved)".green().bold())
                } else {
                    String::new()
                };
                output.push_str(&format!(
                    "  {}. {} [{}]{}\n     {}\n",
                    i + 1,
                    solution.name.bold(),
                    solution.complexity.as_str(),
                    approved,
                    solution.description
                ));
            }
        }

        if let Some(agent) = &run.agent {
            output.push_str(&Self::section_header("Agent"));
            output.push_str(&format!(
                "{} ({})\n",
                agent.id,
                agent.template.as_str()
            ));
            output.push_str(&format!("  Nodes: {}\n", agent.nodes.join(" -> ")));
            output.push_str(&format!(
                "  Tools: {}\n",
                agent
                    .bound_tools
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            output.push_str(&format!(
                "  Threshold {:.2}, label '{}', fallback '{}', channel '{}'\n",
                agent.parameters.threshold,
                agent.parameters.label,
                agent.parameters.fallback_label,
                agent.parameters.notify_channel
            ));
            for degradation in &agent.degradations {
                output.push_str(&format!(
                    "  {} {}: {}\n",
                    "degraded".yellow(),
                    degradation.capability,
                    degradation.reason
                ));
            }
        }

        if let Some(execution) = &run.execution {
            output.push_str(&Self::section_header("Execution"));
            for outcome in &execution.per_item {
                if outcome.succeeded {
                    output.push_str(&format!(
                        "  {} {:<12} {}\n",
                        "v".green(),
                        outcome.item_ref,
                        outcome.applied_action.as_deref().unwrap_or("-")
                    ));
                } else {
                    output.push_str(&format!(
                        "  {} {:<12} {}\n",
                        "x".red(),
                        outcome.item_ref,
                        outcome
                            .error
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_default()
                    ));
                }
            }
        }

        output.push_str(&Self::learning(run));
        output.push_str(&Self::notices(run));
        output.push_str(&Self::paused(run));
        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(run: &PipelineRun) -> String {
        serde_json::to_string_pretty(run).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the gap, the decision and the outcome (concise output)
    pub fn format_summary(run: &PipelineRun) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n\n", "=== gapwise ===".cyan().bold()));
        output.push_str(&format!(
            "{} {}  {}\n",
            "Run:".bold(),
            run.id,
            Self::state(run)
        ));

        if *run.state() == PipelineState::NoGapTerminal {
            output.push_str(&format!("\n{}\n", "No gaps: everything matches your ideal states.".green()));
            return output;
        }

        if let Some(problem) = run.focus() {
            let severity = run
                .gaps
                .iter()
                .find(|g| g.id == problem.gap_id)
                .map(|g| Self::severity(g.severity).to_string())
                .unwrap_or_default();
            output.push_str(&format!(
                "{} {} [{}]\n",
                "Problem:".bold(),
                problem.name,
                severity
            ));
        }

        if let Some(solution) = run.approved() {
            output.push_str(&format!("{} {}\n", "Approved:".bold(), solution.name));
        } else if let Some(reason) = &run.rejection {
            output.push_str(&format!("{} {}\n", "Rejected:".bold(), reason));
        }

        if let Some(execution) = &run.execution {
            let acted = execution.per_item.iter().filter(|o| o.acted()).count();
            let failed = execution.per_item.iter().filter(|o| !o.succeeded).count();
            output.push_str(&format!(
                "{} {} items, {} acted on, {} failed\n",
                "Executed:".bold(),
                execution.per_item.len(),
                acted,
                failed
            ));
        }

        output.push_str(&Self::learning(run));
        output.push_str(&Self::notices(run));
        output.push_str(&Self::paused(run));

        output
    }

    fn learning(run: &PipelineRun) -> String {
        let Some(report) = &run.learning else {
            return String::new();
        };
        let mut output = Self::section_header("Learning");
        match report.accuracy {
            Some(accuracy) => output.push_str(&format!(
                "  Accuracy: {:.0}% over {} items\n",
                accuracy * 100.0,
                report.feedback_count
            )),
            None => output.push_str("  No feedback\n"),
        }
        for key in &report.patterns_updated {
            output.push_str(&format!("  Pattern updated: {}\n", key));
        }
        for adjustment in &report.adjustments {
            output.push_str(&format!(
                "  {}/{}: {} -> {}\n",
                adjustment.domain, adjustment.condition, adjustment.from, adjustment.to
            ));
        }
        output
    }

    fn notices(run: &PipelineRun) -> String {
        if run.notices.is_empty() {
            return String::new();
        }
        let mut output = Self::section_header("Notices");
        for notice in &run.notices {
            let tag = match notice.level {
                NoticeLevel::Info => "info".normal(),
                NoticeLevel::Warning => "warn".yellow(),
                NoticeLevel::Error => "error".red(),
            };
            output.push_str(&format!("  [{}] {}: {}\n", tag, notice.stage, notice.message));
        }
        output
    }

    fn paused(run: &PipelineRun) -> String {
        match run.failure() {
            Some(failure) => format!(
                "\n{} {}\n{} gapwise --resume {}\n",
                "Paused:".red().bold(),
                failure,
                "Resume with:".dimmed(),
                run.id
            ),
            None => String::new(),
        }
    }

    fn state(run: &PipelineRun) -> ColoredString {
        let state = run.state().as_str();
        if run.state().is_paused() {
            state.red().bold()
        } else if run.is_complete() {
            state.green()
        } else {
            state.yellow()
        }
    }

    fn severity(severity: Severity) -> ColoredString {
        match severity {
            Severity::High => severity.as_str().red().bold(),
            Severity::Medium => severity.as_str().yellow(),
            Severity::Low => severity.as_str().normal(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_full(&self, run: &PipelineRun) -> String {
        Self::format_full(run)
    }

    fn format_json(&self, run: &PipelineRun) -> String {
        Self::format_json(run)
    }

    fn format_summary(&self, run: &PipelineRun) -> String {
        Self::format_summary(run)
    }
}

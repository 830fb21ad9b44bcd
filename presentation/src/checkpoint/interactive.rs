//! Interactive human checkpoint for the approval and feedback stops.
//!
//! # User Interface
//!
//! At the approval checkpoint the user sees:
//!
//! ```text
//! ═══════════════════════════════════════════════════════════════
//!   Approval required: inbox overload
//! ═══════════════════════════════════════════════════════════════
//!
//! Cause:  ...
//! Impact: ...
//!
//! Solutions (round 1):
//!   1. Priority triage  [low]  (recommended)
//!      + important items surface first
//!      - scores can misjudge new senders
//!
//! Commands:
//!   <number>        - Approve that solution
//!   /alternatives   - Explore different solutions
//!   /reject <why>   - Reject all proposals
//!
//! approve>
//! ```
//!
//! After execution the user confirms outcomes or corrects them with
//! `item=label` pairs.

use async_trait::async_trait;
use colored::Colorize;
use gapwise_application::{ApprovalDecision, CheckpointError, HumanCheckpointPort};
use gapwise_domain::{
    ExecutionResult, Feedback, FeedbackMap, Notice, NoticeLevel, PipelineFailure, Problem,
    SolutionSet,
};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const DEFAULT_REJECTION: &str = "rejected by user";

/// Interprets one line typed at the approval prompt.
///
/// Returns `None` for empty input and `Some(Err(_))` for input that names
/// no known command or solution.
pub fn parse_decision(
    input: &str,
    solutions: &SolutionSet,
) -> Option<Result<ApprovalDecision, String>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    let decision = match command.to_lowercase().as_str() {
        "/alternatives" | "alternatives" | "alt" | "a" => Ok(ApprovalDecision::RequestAlternatives),
        "/reject" | "reject" | "r" => Ok(ApprovalDecision::Reject {
            reason: if rest.is_empty() {
                DEFAULT_REJECTION.to_string()
            } else {
                rest.to_string()
            },
        }),
        "/approve" | "approve" => select(rest, solutions),
        _ => select(input, solutions),
    };
    Some(decision)
}

/// A solution by 1-based position or by id.
fn select(choice: &str, solutions: &SolutionSet) -> Result<ApprovalDecision, String> {
    let solution = match choice.parse::<usize>() {
        Ok(n) if n >= 1 => solutions.solutions.get(n - 1),
        Ok(_) => None,
        Err(_) => solutions.solutions.iter().find(|s| s.id.as_str() == choice),
    };
    solution
        .map(|s| ApprovalDecision::Approve(s.id.clone()))
        .ok_or_else(|| format!("no solution '{}'", choice))
}

/// Interprets the feedback line.
///
/// Empty input or `y` confirms every succeeded item, `skip` gives no
/// feedback, and `m3=normal, m5=important` corrects those items while
/// confirming the other succeeded ones.
pub fn parse_feedback(input: &str, result: &ExecutionResult) -> Result<FeedbackMap, String> {
    let input = input.trim();
    let succeeded = || {
        result
            .per_item
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.item_ref.clone())
    };

    match input.to_lowercase().as_str() {
        "" | "y" | "yes" => return Ok(FeedbackMap::confirm_all(succeeded())),
        "skip" | "s" | "n" | "no" => return Ok(FeedbackMap::new()),
        _ => {}
    }

    let mut feedback = FeedbackMap::confirm_all(succeeded());
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (item, expected) = pair
            .split_once('=')
            .map(|(item, expected)| (item.trim(), expected.trim()))
            .filter(|(item, expected)| !item.is_empty() && !expected.is_empty())
            .ok_or_else(|| format!("expected item=label, got '{}'", pair))?;
        if result.outcome(item).is_none() {
            return Err(format!("unknown item '{}'", item));
        }
        feedback.insert(
            item,
            Feedback::Corrected {
                expected: expected.to_string(),
            },
        );
    }
    Ok(feedback)
}

/// Interactive checkpoint handler for the terminal.
///
/// Implements [`HumanCheckpointPort`] by printing the proposals and reading
/// commands from stdin. End of input counts as cancellation, which pauses
/// the run so it can be resumed later.
pub struct InteractiveCheckpoint;

impl InteractiveCheckpoint {
    pub fn new() -> Self {
        Self
    }

    fn display_solutions(&self, problem: &Problem, solutions: &SolutionSet, notice: Option<&Notice>) {
        println!();
        println!("{}", RULE.yellow().bold());
        println!(
            "{}",
            format!("  Approval required: {}", problem.name).yellow().bold()
        );
        println!("{}", RULE.yellow().bold());
        println!();

        if let Some(notice) = notice {
            let message = format!("{}: {}", notice.stage, notice.message);
            match notice.level {
                NoticeLevel::Error => println!("{} {}", "!".red().bold(), message.red()),
                _ => println!("{} {}", "!".yellow().bold(), message.yellow()),
            }
            println!();
        }

        println!("{} {}", "Cause: ".cyan().bold(), problem.cause);
        println!("{} {}", "Impact:".cyan().bold(), problem.impact);
        println!();

        let recommended = solutions.recommended().map(|s| s.id.clone());
        println!(
            "{}",
            format!("Solutions (round {}):", solutions.round).cyan().bold()
        );
        for (i, solution) in solutions.solutions.iter().enumerate() {
            let marker = if recommended.as_ref() == Some(&solution.id) {
                format!(" {}", "(recommended)".green())
            } else {
                String::new()
            };
            println!(
                "  {}. {}  [{}]{}",
                i + 1,
                solution.name.bold(),
                solution.complexity.as_str(),
                marker
            );
            println!("     {}", solution.description.dimmed());
            for pro in &solution.pros {
                println!("     {} {}", "+".green(), pro);
            }
            for con in &solution.cons {
                println!("     {} {}", "-".red(), con);
            }
        }
        println!();

        println!("{}", "Commands:".cyan().bold());
        println!("  {}        - Approve that solution", "<number>".green());
        println!("  {}   - Explore different solutions", "/alternatives".yellow());
        println!("  {}   - Reject all proposals", "/reject <why>".red());
        println!();
    }

    fn display_outcomes(&self, result: &ExecutionResult) {
        println!();
        println!("{}", "Execution outcomes:".cyan().bold());
        for outcome in &result.per_item {
            if outcome.succeeded {
                println!(
                    "  {} {:<12} {}",
                    "v".green(),
                    outcome.item_ref,
                    outcome.applied_action.as_deref().unwrap_or("-")
                );
            } else {
                let error = outcome
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                println!("  {} {:<12} {}", "x".red(), outcome.item_ref, error.dimmed());
            }
        }
        println!();
        println!(
            "Press {} to confirm all, {} to give no feedback, or correct items as {}",
            "Enter".green(),
            "skip".yellow(),
            "m3=normal, m5=important".cyan()
        );
    }

    /// Read one line; end of input is a cancellation.
    fn read_line(&self, prompt: &str) -> Result<String, CheckpointError> {
        print!("{} ", prompt.magenta().bold());
        io::stdout()
            .flush()
            .map_err(|e| CheckpointError::IoError(format!("Failed to flush stdout: {}", e)))?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .map_err(|e| CheckpointError::IoError(format!("Failed to read input: {}", e)))?;
        if read == 0 {
            return Err(CheckpointError::Cancelled);
        }
        Ok(input.trim().to_string())
    }
}

impl Default for InteractiveCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanCheckpointPort for InteractiveCheckpoint {
    async fn review_solutions(
        &self,
        problem: &Problem,
        solutions: &SolutionSet,
        notice: Option<&Notice>,
    ) -> Result<ApprovalDecision, CheckpointError> {
        self.display_solutions(problem, solutions, notice);

        loop {
            let input = self.read_line("approve>")?;
            match parse_decision(&input, solutions) {
                None => continue,
                Some(Ok(decision)) => {
                    println!();
                    match &decision {
                        ApprovalDecision::Approve(id) => {
                            println!("{}", format!("✓ Approved {}", id).green())
                        }
                        ApprovalDecision::Reject { reason } => {
                            println!("{}", format!("✗ Rejected: {}", reason).red())
                        }
                        ApprovalDecision::RequestAlternatives => {
                            println!("{}", "↻ Exploring alternatives".yellow())
                        }
                    }
                    return Ok(decision);
                }
                Some(Err(message)) => {
                    println!("{} {}", "?".yellow(), message);
                }
            }
        }
    }

    async fn collect_feedback(
        &self,
        result: &ExecutionResult,
    ) -> Result<FeedbackMap, CheckpointError> {
        self.display_outcomes(result);

        loop {
            let input = self.read_line("feedback>")?;
            match parse_feedback(&input, result) {
                Ok(feedback) => return Ok(feedback),
                Err(message) => println!("{} {}", "?".yellow(), message),
            }
        }
    }

    fn on_paused(&self, failure: &PipelineFailure) {
        println!();
        println!("{} {}", "Run paused:".red().bold(), failure);
    }
}

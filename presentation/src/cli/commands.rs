//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Every stage: snapshot, gaps, problems, solutions, agent, outcomes
    Full,
    /// Gap, approved solution and learning outcome
    Summary,
    /// The run record as JSON
    Json,
}

impl From<FormatArg> for gapwise_domain::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Full => gapwise_domain::OutputFormat::Full,
            FormatArg::Summary => gapwise_domain::OutputFormat::Summary,
            FormatArg::Json => gapwise_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for gapwise
#[derive(Parser, Debug)]
#[command(name = "gapwise")]
#[command(author, version, about = "Find the gaps between how things are and how you want them, then close them")]
#[command(long_about = r#"
gapwise compares a snapshot of your data (an inbox export, a task list) with
the ideal states declared in your world model, and proposes agents to close
the gaps it finds.

Each run goes through these stages:
1. Snapshot: load the sensed items and the current time
2. Expectation: turn the world model into concrete criteria
3. Gaps: compare the snapshot against the criteria and rank the gaps
4. Problems: interpret each gap as a problem with cause and impact
5. Solutions: propose alternatives for the most severe problem
6. Approval: you approve, reject, or ask for alternatives
7. Agent: compose and execute an agent from the approved solution
8. Learning: your feedback adjusts the world model

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./gapwise.toml      Project-level config
3. ~/.config/gapwise/config.toml   Global config

Example:
  gapwise --inbox inbox.json
  gapwise --offline --auto-approve -o full
  gapwise --resume latest
"#)]
pub struct Cli {
    /// World model file (overrides [storage].world_model)
    #[arg(long, value_name = "PATH")]
    pub world_model: Option<PathBuf>,

    /// Sensed items file (overrides [storage].sensed_items)
    #[arg(long, value_name = "PATH")]
    pub inbox: Option<PathBuf>,

    /// Resume a saved run by id, or `latest`
    #[arg(long, value_name = "RUN_ID")]
    pub resume: Option<String>,

    /// Approve the recommended solution and confirm every outcome
    #[arg(long, conflicts_with = "auto_reject")]
    pub auto_approve: bool,

    /// Reject every proposal
    #[arg(long)]
    pub auto_reject: bool,

    /// Output format (defaults to [output].format, then summary)
    #[arg(short, long, value_enum)]
    pub output: Option<FormatArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Use the offline heuristic provider regardless of configuration
    #[arg(long)]
    pub offline: bool,
}

impl Cli {
    /// `--resume latest` asks for the most recent saved run.
    pub fn resume_latest(&self) -> bool {
        self.resume
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case("latest"))
    }
}

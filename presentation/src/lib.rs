//! Presentation layer for gapwise
//!
//! This crate contains the CLI definition, the interactive human
//! checkpoint, output formatters and progress reporters.

pub mod checkpoint;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use checkpoint::InteractiveCheckpoint;
pub use cli::commands::{Cli, FormatArg};
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};

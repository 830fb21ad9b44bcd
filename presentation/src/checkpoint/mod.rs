//! Terminal implementation of the human checkpoint

mod interactive;

pub use interactive::{InteractiveCheckpoint, parse_decision, parse_feedback};

pub mod result;

pub use result::{ExecutionFailure, ExecutionResult, ItemOutcome};

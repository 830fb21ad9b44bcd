//! Tool executor port
//!
//! Defines how agents invoke the tools bound to them.

use async_trait::async_trait;
use gapwise_domain::{ToolCall, ToolCatalog, ToolOutput};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Tools this executor can run.
    fn catalog(&self) -> &ToolCatalog;

    async fn invoke(&self, call: &ToolCall) -> Result<ToolOutput, ToolError>;
}

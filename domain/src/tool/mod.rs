//! Tools agents can bind: catalog, aliases and call/output value objects

pub mod call;
pub mod catalog;

pub use call::{ToolCall, ToolOutput};
pub use catalog::{ToolCatalog, ToolDefinition, ToolKind, builtin};

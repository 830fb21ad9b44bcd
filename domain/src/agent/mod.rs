//! Agents: validated execution graphs, the templates that produce them and
//! the per-item state they branch on.

pub mod entities;
pub mod graph;
pub mod state;
pub mod template;

pub use entities::{Agent, AgentSummary, Degradation};
pub use graph::{
    AgentAction, AgentGraph, Edge, EdgeCondition, GraphBuilder, GraphNode, GraphValidationError,
    NodeKind,
};
pub use state::AgentState;
pub use template::{AgentParameters, AgentTemplate, Assembly, ParameterOverrides, TemplateRegistry};

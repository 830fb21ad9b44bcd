//! Composed agents.

use crate::agent::graph::AgentGraph;
use crate::agent::template::{AgentParameters, AgentTemplate};
use crate::core::ids::{AgentId, ProblemId, SolutionId, ToolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A capability the agent runs without, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub capability: String,
    pub reason: String,
}

impl Degradation {
    pub fn new(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.capability, self.reason)
    }
}

/// An executable agent produced by the composer from an approved solution.
///
/// Agents are immutable once built; re-composition produces a new agent with a
/// new id.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub source_solution_id: SolutionId,
    pub problem_id: ProblemId,
    pub template: AgentTemplate,
    pub graph: AgentGraph,
    pub bound_tools: BTreeSet<ToolId>,
    pub parameters: AgentParameters,
    pub degradations: Vec<Degradation>,
}

impl Agent {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id.clone(),
            source_solution_id: self.source_solution_id.clone(),
            template: self.template,
            nodes: self
                .graph
                .node_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            bound_tools: self.bound_tools.iter().cloned().collect(),
            parameters: self.parameters.clone(),
            degradations: self.degradations.clone(),
        }
    }
}

/// Serializable view of an [`Agent`] kept in the run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub source_solution_id: SolutionId,
    pub template: AgentTemplate,
    pub nodes: Vec<String>,
    pub bound_tools: Vec<ToolId>,
    pub parameters: AgentParameters,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

impl AgentSummary {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::builtin;

    #[test]
    fn test_summary_reflects_agent() {
        let bound: BTreeSet<ToolId> = [builtin::READ_ITEM, builtin::SCORE_PRIORITY]
            .into_iter()
            .map(ToolId::new)
            .collect();
        let params = AgentParameters::default();
        let assembly = AgentTemplate::Prioritization
            .assemble(&params, &bound)
            .unwrap();
        let agent = Agent {
            id: AgentId::new("agent-1"),
            source_solution_id: SolutionId::new("s1"),
            problem_id: ProblemId::new("problem-gap-1"),
            template: AgentTemplate::Prioritization,
            graph: assembly.graph,
            bound_tools: bound,
            parameters: params,
            degradations: assembly.degradations,
        };

        let summary = agent.summary();
        assert!(agent.is_degraded());
        assert!(summary.is_degraded());
        assert_eq!(summary.nodes.len(), 4);
        assert_eq!(summary.bound_tools.len(), 2);
        assert_eq!(summary.degradations[0].to_string(), "apply_label: tool unavailable; action skipped");
    }
}

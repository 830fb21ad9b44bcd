//! Agent execution graphs.
//!
//! An agent is data, not code: a set of tagged [`GraphNode`]s connected by
//! [`Edge`]s whose [`EdgeCondition`] is evaluated against the per-item
//! [`AgentState`]. [`AgentGraph::new`] is the only way to obtain a graph and
//! it enforces the structural rules:
//!
//! - at least one node, unique node ids, edges only between known nodes
//! - acyclic
//! - exactly one entry node (no incoming edges), every node reachable from it
//! - every node without outgoing edges is an `Act` node (each branch terminates
//!   in an action)

use crate::agent::state::AgentState;
use crate::core::ids::{NodeId, ToolId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Terminal action of an `Act` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAction {
    ApplyLabel { label: String },
    Notify { channel: String },
    Skip { reason: Option<String> },
}

impl AgentAction {
    /// Tool the action needs, if any.
    pub fn tool(&self) -> Option<ToolId> {
        use crate::tool::builtin;
        match self {
            AgentAction::ApplyLabel { .. } => Some(ToolId::new(builtin::APPLY_LABEL)),
            AgentAction::Notify { .. } => Some(ToolId::new(builtin::NOTIFY)),
            AgentAction::Skip { .. } => None,
        }
    }

    /// Short descriptor used in execution results and learned patterns.
    pub fn describe(&self) -> String {
        match self {
            AgentAction::ApplyLabel { label } => format!("label:{}", label),
            AgentAction::Notify { channel } => format!("notify:{}", channel),
            AgentAction::Skip { .. } => "skip".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Runs sensing/analysis tools to populate the agent state.
    Analyze { tools: Vec<ToolId> },
    /// Pure branching point; only its outgoing edges matter.
    Decide,
    Act { action: AgentAction },
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Analyze { .. } => "analyze",
            NodeKind::Decide => "decide",
            NodeKind::Act { .. } => "act",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Boolean predicate over the agent state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum EdgeCondition {
    Always,
    /// `score > threshold`; false when the item has no score.
    ScoreAbove { threshold: f64 },
    /// `score <= threshold`; false when the item has no score.
    ScoreAtMost { threshold: f64 },
    LabelIs { label: String },
    FieldEquals { field: String, value: Value },
}

impl EdgeCondition {
    pub fn evaluate(&self, state: &AgentState) -> bool {
        match self {
            EdgeCondition::Always => true,
            EdgeCondition::ScoreAbove { threshold } => state.score.is_some_and(|s| s > *threshold),
            EdgeCondition::ScoreAtMost { threshold } => {
                state.score.is_some_and(|s| s <= *threshold)
            }
            EdgeCondition::LabelIs { label } => state
                .label
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(label)),
            EdgeCondition::FieldEquals { field, value } => state.field(field) == Some(value),
        }
    }
}

impl std::fmt::Display for EdgeCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeCondition::Always => write!(f, "always"),
            EdgeCondition::ScoreAbove { threshold } => write!(f, "score > {}", threshold),
            EdgeCondition::ScoreAtMost { threshold } => write!(f, "score <= {}", threshold),
            EdgeCondition::LabelIs { label } => write!(f, "label == {}", label),
            EdgeCondition::FieldEquals { field, value } => write!(f, "{} == {}", field, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub condition: EdgeCondition,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphValidationError {
    #[error("Graph has no nodes")]
    Empty,

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Edge {from} -> {to} references an unknown node")]
    UnknownNode { from: String, to: String },

    #[error("Cycle detected at node: {0}")]
    CycleDetected(String),

    #[error("Graph has no entry node")]
    NoEntry,

    #[error("Graph has multiple entry nodes: {0:?}")]
    MultipleEntries(Vec<String>),

    #[error("Node {0} is unreachable from the entry node")]
    Unreachable(String),

    #[error("Branch ends at non-action node: {0}")]
    DeadEnd(String),
}

/// A validated execution graph. Edges keep declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
    entry: NodeId,
}

impl AgentGraph {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<Edge>) -> Result<Self, GraphValidationError> {
        let entry = validate(&nodes, &edges)?;
        Ok(Self {
            nodes,
            edges,
            entry,
        })
    }

    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn entry(&self) -> &NodeId {
        &self.entry
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Outgoing edges of `id` in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.from == id)
    }

    pub fn is_terminal(&self, id: &NodeId) -> bool {
        self.outgoing(id).next().is_none()
    }
}

/// Incremental builder; validation happens in [`GraphBuilder::build`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn node(mut self, id: impl Into<NodeId>, kind: NodeKind) -> Self {
        self.nodes.push(GraphNode {
            id: id.into(),
            kind,
        });
        self
    }

    pub fn edge(
        mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        condition: EdgeCondition,
    ) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            condition,
        });
        self
    }

    pub fn build(self) -> Result<AgentGraph, GraphValidationError> {
        AgentGraph::new(self.nodes, self.edges)
    }
}

fn validate(nodes: &[GraphNode], edges: &[Edge]) -> Result<NodeId, GraphValidationError> {
    if nodes.is_empty() {
        return Err(GraphValidationError::Empty);
    }

    let mut known: HashSet<&NodeId> = HashSet::new();
    for node in nodes {
        if !known.insert(&node.id) {
            return Err(GraphValidationError::DuplicateNode(node.id.to_string()));
        }
    }

    let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    let mut has_incoming: HashSet<&NodeId> = HashSet::new();
    for edge in edges {
        if !known.contains(&edge.from) || !known.contains(&edge.to) {
            return Err(GraphValidationError::UnknownNode {
                from: edge.from.to_string(),
                to: edge.to.to_string(),
            });
        }
        adjacency.entry(&edge.from).or_default().push(&edge.to);
        has_incoming.insert(&edge.to);
    }

    // Cycle check before entry detection so a fully cyclic graph reports the cycle
    let mut visited = HashSet::new();
    let mut stack = HashSet::new();
    for node in nodes {
        if let Some(at) = find_cycle(&node.id, &adjacency, &mut visited, &mut stack) {
            return Err(GraphValidationError::CycleDetected(at.to_string()));
        }
    }

    let entries: Vec<&NodeId> = nodes
        .iter()
        .map(|n| &n.id)
        .filter(|id| !has_incoming.contains(id))
        .collect();
    let entry = match entries.as_slice() {
        [] => return Err(GraphValidationError::NoEntry),
        [single] => (*single).clone(),
        many => {
            return Err(GraphValidationError::MultipleEntries(
                many.iter().map(|id| id.to_string()).collect(),
            ));
        }
    };

    let mut reachable: HashSet<&NodeId> = HashSet::new();
    let mut queue = VecDeque::from([&entry]);
    while let Some(id) = queue.pop_front() {
        if reachable.insert(id) {
            for next in adjacency.get(id).into_iter().flatten() {
                queue.push_back(*next);
            }
        }
    }
    for node in nodes {
        if !reachable.contains(&node.id) {
            return Err(GraphValidationError::Unreachable(node.id.to_string()));
        }
        let terminal = adjacency.get(&node.id).is_none_or(|out| out.is_empty());
        if terminal && !matches!(node.kind, NodeKind::Act { .. }) {
            return Err(GraphValidationError::DeadEnd(node.id.to_string()));
        }
    }

    Ok(entry)
}

/// DFS with a recursion stack; returns the node closing a cycle, if any.
fn find_cycle<'a>(
    id: &'a NodeId,
    adjacency: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
    visited: &mut HashSet<&'a NodeId>,
    stack: &mut HashSet<&'a NodeId>,
) -> Option<&'a NodeId> {
    if stack.contains(id) {
        return Some(id);
    }
    if !visited.insert(id) {
        return None;
    }
    stack.insert(id);
    for next in adjacency.get(id).into_iter().flatten() {
        if let Some(at) = find_cycle(*next, adjacency, visited, stack) {
            return Some(at);
        }
    }
    stack.remove(id);
    None
}

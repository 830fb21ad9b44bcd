//! Agent execution stage.
//!
//! Walks the agent's graph once per sensed item. Items run concurrently up to
//! `max_concurrency`; results come back in input order. A tool error or a
//! node without a matching edge fails only that item.

use crate::ports::progress::PipelineProgressNotifier;
use crate::ports::tool_executor::ToolExecutorPort;
use futures::stream::{self, StreamExt};
use gapwise_domain::{
    Agent, AgentAction, AgentState, ExecutionFailure, ExecutionResult, ItemOutcome, NodeId,
    NodeKind, SensedItem, Stage, ToolCall, ToolId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ExecuteAgentUseCase<T: ToolExecutorPort + 'static> {
    tools: Arc<T>,
    max_concurrency: usize,
}

impl<T: ToolExecutorPort + 'static> ExecuteAgentUseCase<T> {
    pub fn new(tools: Arc<T>, max_concurrency: usize) -> Self {
        Self {
            tools,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn execute(
        &self,
        agent: &Agent,
        items: &[SensedItem],
        progress: &dyn PipelineProgressNotifier,
    ) -> ExecutionResult {
        info!(
            "Executing agent {} over {} items (concurrency {})",
            agent.id,
            items.len(),
            self.max_concurrency
        );

        let mut outcomes: Vec<(usize, ItemOutcome)> = stream::iter(items.iter().enumerate())
            .map(|(index, item)| async move {
                let outcome = self.run_item(agent, item).await;
                progress.on_item_processed(Stage::Execution, &item.id, outcome.succeeded);
                (index, outcome)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let result = ExecutionResult::new(
            agent.id.clone(),
            outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        );
        info!(
            "Agent {} finished: {} succeeded, {} failed, {} acted",
            agent.id,
            result.succeeded_count(),
            result.failed_count(),
            result.acted_count()
        );
        result
    }

    async fn run_item(&self, agent: &Agent, item: &SensedItem) -> ItemOutcome {
        let graph = &agent.graph;
        let mut state = AgentState::for_item(item);
        let mut path: Vec<NodeId> = Vec::new();
        let mut current = graph.entry().clone();

        loop {
            let Some(node) = graph.node(&current) else {
                return ItemOutcome::failed(
                    &item.id,
                    ExecutionFailure::UnknownNode {
                        node: current.to_string(),
                    },
                    path,
                );
            };
            path.push(current.clone());

            match &node.kind {
                NodeKind::Analyze { tools } => {
                    for tool in tools {
                        match self.invoke(agent, tool, item).await {
                            Ok(output) => state.absorb(&output),
                            Err(failure) => return ItemOutcome::failed(&item.id, failure, path),
                        }
                    }
                }
                NodeKind::Decide => {}
                NodeKind::Act { action } => {
                    if let Some(tool) = action.tool()
                        && let Err(failure) = self.invoke_action(&tool, action, item).await
                    {
                        return ItemOutcome::failed(&item.id, failure, path);
                    }
                    debug!("{}: {}", item.id, action.describe());
                    return ItemOutcome::applied(&item.id, action.describe(), path);
                }
            }

            // First edge whose condition holds wins
            let next = graph
                .outgoing(&current)
                .find(|edge| edge.condition.evaluate(&state))
                .map(|edge| edge.to.clone());
            match next {
                Some(next) => current = next,
                None => {
                    warn!("{}: no transition out of {}", item.id, current);
                    return ItemOutcome::failed(
                        &item.id,
                        ExecutionFailure::NoMatchingTransition {
                            node: current.to_string(),
                        },
                        path,
                    );
                }
            }
        }
    }

    async fn invoke(
        &self,
        agent: &Agent,
        tool: &ToolId,
        item: &SensedItem,
    ) -> Result<gapwise_domain::ToolOutput, ExecutionFailure> {
        let call = ToolCall::new(tool.clone(), item.clone())
            .with_arg("label", agent.parameters.label.clone())
            .with_arg("fallback_label", agent.parameters.fallback_label.clone());
        self.call(call).await
    }

    async fn invoke_action(
        &self,
        tool: &ToolId,
        action: &AgentAction,
        item: &SensedItem,
    ) -> Result<(), ExecutionFailure> {
        let call = ToolCall::new(tool.clone(), item.clone());
        let call = match action {
            AgentAction::ApplyLabel { label } => call.with_arg("label", label.clone()),
            AgentAction::Notify { channel } => call.with_arg("channel", channel.clone()),
            AgentAction::Skip { .. } => call,
        };
        self.call(call).await.map(|_| ())
    }

    async fn call(&self, call: ToolCall) -> Result<gapwise_domain::ToolOutput, ExecutionFailure> {
        self.tools
            .invoke(&call)
            .await
            .map_err(|e| ExecutionFailure::ToolFailed {
                tool: call.tool.to_string(),
                message: e.to_string(),
            })
    }
}

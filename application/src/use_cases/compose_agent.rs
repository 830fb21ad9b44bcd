//! Agent composition stage.
//!
//! Turns an approved solution into an executable [`Agent`]:
//!
//! 1. resolve the template from the solution's archetype (never fails)
//! 2. extract parameters with one bounded inference call, falling back to the
//!    template defaults
//! 3. bind the solution's tools and the template's tools against the catalog
//! 4. assemble and validate the graph
//!
//! Every capability lost along the way is recorded as a [`Degradation`].

use super::shared::InferenceClient;
use crate::ports::inference_gateway::InferenceGateway;
use crate::ports::tool_executor::ToolExecutorPort;
use gapwise_domain::inference::parse_parameters;
use gapwise_domain::{
    Agent, AgentId, AgentParameters, Degradation, GraphValidationError, Problem, PromptTemplate,
    Solution, TemplateRegistry, ToolId,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    #[error("Invalid execution graph: {0}")]
    InvalidGraph(#[from] GraphValidationError),
}

pub struct ComposeAgentUseCase<G: InferenceGateway + 'static, T: ToolExecutorPort + 'static> {
    client: InferenceClient<G>,
    tools: Arc<T>,
    templates: TemplateRegistry,
    defaults: AgentParameters,
}

impl<G: InferenceGateway + 'static, T: ToolExecutorPort + 'static> ComposeAgentUseCase<G, T> {
    pub fn new(client: InferenceClient<G>, tools: Arc<T>) -> Self {
        Self {
            client,
            tools,
            templates: TemplateRegistry::default(),
            defaults: AgentParameters::default(),
        }
    }

    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_defaults(mut self, defaults: AgentParameters) -> Self {
        self.defaults = defaults;
        self
    }

    pub async fn execute(
        &self,
        problem: &Problem,
        solution: &Solution,
    ) -> Result<Agent, CompositionError> {
        let archetype = solution.archetype();
        let template = self.templates.resolve(&archetype);
        info!(
            "Composing '{}' ({}) with the {} template",
            solution.name,
            archetype,
            template.as_str()
        );

        let mut degradations = Vec::new();

        // ==================== Parameters ====================

        let request = PromptTemplate::parameters(solution, template, &self.defaults);
        let parameters = match self.client.request(request, parse_parameters).await {
            Ok(overrides) => {
                let (parameters, defaulted) = self.defaults.apply(&overrides);
                if !defaulted.is_empty() {
                    debug!("Parameters defaulted: {}", defaulted.join(", "));
                }
                parameters
            }
            Err(e) => {
                degradations.push(Degradation::new(
                    "parameters",
                    format!("extraction failed ({}); template defaults used", e),
                ));
                self.defaults.clone()
            }
        };

        // ==================== Tool binding ====================

        let catalog = self.tools.catalog();
        let mut bound: BTreeSet<ToolId> = BTreeSet::new();
        for name in &solution.required_tools {
            match catalog.resolve(name) {
                Some(id) => {
                    bound.insert(id);
                }
                None => degradations.push(Degradation::new(
                    name.as_str(),
                    "not in the tool catalog; dropped",
                )),
            }
        }
        for name in template.tools() {
            let id = ToolId::new(*name);
            if catalog.contains(&id) {
                bound.insert(id);
            }
        }

        // ==================== Assembly ====================

        let assembly = template.assemble(&parameters, &bound)?;
        for degradation in assembly.degradations {
            if !degradations.contains(&degradation) {
                degradations.push(degradation);
            }
        }

        for degradation in &degradations {
            warn!("Agent for '{}' degraded: {}", solution.name, degradation);
        }

        let agent = Agent {
            id: AgentId::generate(),
            source_solution_id: solution.id.clone(),
            problem_id: problem.id.clone(),
            template,
            graph: assembly.graph,
            bound_tools: bound,
            parameters,
            degradations,
        };
        info!(
            "Composed agent {} with nodes [{}]",
            agent.id,
            agent.graph.node_ids().join(", ")
        );
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTools, ScriptedGateway};
    use gapwise_domain::tool::builtin;
    use gapwise_domain::{
        AgentTemplate, Gap, OutputSchema, ProblemAnalysis, Severity, SolutionArchetype,
        ToolCatalog, ToolDefinition, ToolKind,
    };
    use std::time::Duration;

    fn problem() -> Problem {
        Problem::from_analysis(
            &Gap::new("gap-1", "unread exceeds ideal by 3", Severity::High),
            ProblemAnalysis::default(),
        )
    }

    fn triage() -> Solution {
        Solution::new("s-1", "Priority triage", "score and label important mail")
            .with_category("prioritization")
            .with_tools(["email_reader", "priority_scorer", "label_applier"])
    }

    fn composer(
        gateway: ScriptedGateway,
        tools: FakeTools,
    ) -> ComposeAgentUseCase<ScriptedGateway, FakeTools> {
        ComposeAgentUseCase::new(
            InferenceClient::new(Arc::new(gateway), Duration::from_millis(50)),
            Arc::new(tools),
        )
    }

    fn nodes(agent: &Agent) -> Vec<&str> {
        let mut nodes = agent.graph.node_ids();
        nodes.sort();
        nodes
    }

    #[tokio::test]
    async fn test_prioritization_agent() {
        let gateway = ScriptedGateway::new()
            .respond(OutputSchema::AgentParameters, r#"{"threshold": 70, "label": "urgent"}"#);
        let agent = composer(gateway, FakeTools::new())
            .execute(&problem(), &triage())
            .await
            .unwrap();

        assert_eq!(agent.template, AgentTemplate::Prioritization);
        assert_eq!(nodes(&agent), vec!["act-label", "act-skip", "analyze", "decide"]);
        assert_eq!(agent.parameters.threshold, 0.7);
        assert_eq!(agent.parameters.label, "urgent");
        assert!(!agent.is_degraded());
        assert_eq!(agent.problem_id, problem().id);
    }

    #[tokio::test]
    async fn test_parameter_failure_uses_defaults() {
        let gateway = ScriptedGateway::new().hang(OutputSchema::AgentParameters);
        let agent = composer(gateway, FakeTools::new())
            .execute(&problem(), &triage())
            .await
            .unwrap();

        assert_eq!(agent.parameters, AgentParameters::default());
        assert!(agent.degradations.iter().any(|d| d.capability == "parameters"));
    }

    #[tokio::test]
    async fn test_unknown_tool_dropped_and_degraded() {
        let gateway = ScriptedGateway::new().respond(OutputSchema::AgentParameters, "{}");
        let solution = triage().with_tools(["crm_sync"]);
        let agent = composer(gateway, FakeTools::new())
            .execute(&problem(), &solution)
            .await
            .unwrap();

        assert!(agent.is_degraded());
        assert!(agent.degradations.iter().any(|d| d.capability == "crm_sync"));
        assert!(!agent.bound_tools.iter().any(|t| t.as_str() == "crm_sync"));
    }

    #[tokio::test]
    async fn test_missing_action_tool_downgrades_to_skip() {
        let catalog = ToolCatalog::new()
            .register(ToolDefinition::new(builtin::READ_ITEM, "read", ToolKind::Sense))
            .register(ToolDefinition::new(
                builtin::SCORE_PRIORITY,
                "score",
                ToolKind::Analyze,
            ));
        let gateway = ScriptedGateway::new().respond(OutputSchema::AgentParameters, "{}");
        let agent = composer(gateway, FakeTools::with_catalog(catalog))
            .execute(&problem(), &triage())
            .await
            .unwrap();

        assert!(agent.is_degraded());
        assert!(
            agent
                .degradations
                .iter()
                .any(|d| d.capability == builtin::APPLY_LABEL)
        );
    }

    #[tokio::test]
    async fn test_unknown_archetype_gets_generic_template() {
        let gateway = ScriptedGateway::new().respond(OutputSchema::AgentParameters, "{}");
        let solution = Solution::new("s-2", "Archive newsletters", "move newsletters away")
            .with_category("archival");
        assert_eq!(
            solution.archetype(),
            SolutionArchetype::Other("archival".into())
        );
        let agent = composer(gateway, FakeTools::new())
            .execute(&problem(), &solution)
            .await
            .unwrap();
        assert_eq!(agent.template, AgentTemplate::Generic);
    }

    #[tokio::test]
    async fn test_registered_archetype_overrides_default() {
        let gateway = ScriptedGateway::new().respond(OutputSchema::AgentParameters, "{}");
        let solution = Solution::new("s-3", "Archive", "sort the archive").with_category("archival");
        let agent = composer(gateway, FakeTools::new())
            .with_templates(TemplateRegistry::default().register(
                SolutionArchetype::Other("archival".into()),
                AgentTemplate::Classification,
            ))
            .execute(&problem(), &solution)
            .await
            .unwrap();
        assert_eq!(agent.template, AgentTemplate::Classification);
    }
}

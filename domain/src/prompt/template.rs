//! Prompt templates for each inference stage

use crate::agent::template::{AgentParameters, AgentTemplate};
use crate::context::metrics::observe_criteria;
use crate::context::snapshot::ContextSnapshot;
use crate::inference::request::{InferenceRequest, OutputSchema};
use crate::pipeline::expectation::Expectation;
use crate::pipeline::gap::Gap;
use crate::pipeline::problem::Problem;
use crate::pipeline::solution::Solution;
use crate::world::entities::WorldModel;
use serde_json::json;

/// Builds the [`InferenceRequest`] for every stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for expectation synthesis
    pub fn expectation_system() -> &'static str {
        r#"You are the expectation layer of a personal assistant.
Given the user's world model (goals, preferences, behavioral patterns and declared ideal states) and the current context, describe what the ideal state of the user's world looks like right now.
Express it as measurable criteria. Prefer the user's declared ideal states and adapt them to the time of day and weekday.
Use conditions that can be counted over the sensed items when possible (for example unread_count)."#
    }

    pub fn expectation(model: &WorldModel, snapshot: &ContextSnapshot) -> InferenceRequest {
        InferenceRequest::new(
            Self::expectation_system(),
            OutputSchema::Expectation,
            json!({
                "world_model": model,
                "context": snapshot.to_payload(),
            }),
        )
    }

    /// System prompt for gap comparison
    pub fn gaps_system() -> &'static str {
        r#"You compare the current state of the user's world with the ideal state.
Report every discrepancy as a gap with a severity of high, medium or low and the ids of the sensed items involved.
Pre-computed observations are included where a criterion could be measured; trust them.
Return an empty list when reality already matches the ideal."#
    }

    pub fn gaps(expectation: &Expectation, snapshot: &ContextSnapshot) -> InferenceRequest {
        InferenceRequest::new(
            Self::gaps_system(),
            OutputSchema::Gaps,
            json!({
                "expectation": expectation,
                "observations": observe_criteria(&expectation.criteria, snapshot.items()),
                "context": snapshot.to_payload(),
            }),
        )
    }

    /// System prompt for problem interpretation
    pub fn interpretation_system() -> &'static str {
        r#"You turn a detected gap into an actionable problem definition.
Give the problem a short name, describe it, explain its most likely cause and the impact if it stays unresolved.
Leave a field empty rather than guessing when the evidence does not support it."#
    }

    pub fn interpretation(gap: &Gap, snapshot: &ContextSnapshot) -> InferenceRequest {
        let related: Vec<_> = snapshot
            .items()
            .iter()
            .filter(|item| gap.related_items.contains(&item.id))
            .collect();
        InferenceRequest::new(
            Self::interpretation_system(),
            OutputSchema::ProblemAnalysis,
            json!({
                "gap": gap,
                "related_items": related,
                "current_time": snapshot.current_time().to_rfc3339(),
            }),
        )
    }

    /// System prompt for solution exploration
    pub fn exploration_system() -> &'static str {
        r#"You propose automation solutions for a user's problem.
Each solution will be turned into a small agent, so keep it narrowly scoped and say which tools it needs.
Give every solution a category (prioritization, classification, reminder or a short custom name), honest pros and cons and a complexity of low, medium or high.
Never repeat a solution listed under "exclude"."#
    }

    pub fn exploration(
        problem: &Problem,
        count: usize,
        exclude: &[String],
        available_tools: &[String],
    ) -> InferenceRequest {
        InferenceRequest::new(
            Self::exploration_system(),
            OutputSchema::Solutions,
            json!({
                "problem": problem,
                "count": count,
                "exclude": exclude,
                "available_tools": available_tools,
            }),
        )
    }

    /// System prompt for agent parameter extraction
    pub fn parameters_system() -> &'static str {
        r#"You configure an automation agent from an approved solution.
Extract the concrete parameters the solution implies: the priority score threshold between 0 and 1, the label to apply, the fallback label and the notification channel.
Omit any parameter the solution does not imply."#
    }

    pub fn parameters(
        solution: &Solution,
        template: AgentTemplate,
        defaults: &AgentParameters,
    ) -> InferenceRequest {
        InferenceRequest::new(
            Self::parameters_system(),
            OutputSchema::AgentParameters,
            json!({
                "solution": solution,
                "template": template.as_str(),
                "defaults": defaults,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::snapshot::SensedItem;
    use crate::core::ids::GapId;
    use crate::pipeline::expectation::Criterion;
    use crate::pipeline::gap::Severity;
    use chrono::{FixedOffset, TimeZone};

    fn snapshot() -> ContextSnapshot {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 3, 9, 0, 0)
            .unwrap();
        ContextSnapshot::new(
            vec![
                SensedItem::new("m1", json!({"read": false})),
                SensedItem::new("m2", json!({"read": true})),
            ],
            now,
        )
    }

    #[test]
    fn test_gaps_request_carries_observations() {
        let expectation = Expectation {
            ideal_description: "calm inbox".into(),
            criteria: vec![Criterion::new("inbox", "unread_count", json!(0))],
        };
        let request = PromptTemplate::gaps(&expectation, &snapshot());
        assert_eq!(request.schema, OutputSchema::Gaps);
        assert_eq!(request.payload["observations"][0]["observed"], 1.0);
        assert_eq!(request.payload["observations"][0]["excess"], 1.0);
    }

    #[test]
    fn test_interpretation_includes_only_related_items() {
        let gap = Gap::new(GapId::new("gap-1"), "unread", Severity::High)
            .with_related_items(["m1"]);
        let request = PromptTemplate::interpretation(&gap, &snapshot());
        let related = request.payload["related_items"].as_array().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0]["id"], "m1");
    }
}

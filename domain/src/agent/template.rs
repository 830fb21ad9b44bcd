//! Agent templates and the archetype → template registry.
//!
//! Each template knows which tools it wants and how to lay out its graph.
//! Missing tools never abort assembly: the affected capability is downgraded
//! (an action becomes a skip, a branch collapses) and a [`Degradation`] is
//! reported instead.

use crate::agent::entities::Degradation;
use crate::agent::graph::{AgentAction, AgentGraph, EdgeCondition, GraphValidationError, NodeKind};
use crate::core::ids::ToolId;
use crate::pipeline::solution::SolutionArchetype;
use crate::tool::catalog::builtin::{APPLY_LABEL, CLASSIFY, NOTIFY, READ_ITEM, SCORE_PRIORITY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Concrete parameters an agent runs with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParameters {
    /// Priority score above which the primary action applies (0.0 - 1.0).
    pub threshold: f64,
    pub label: String,
    pub fallback_label: String,
    pub notify_channel: String,
}

impl Default for AgentParameters {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            label: "important".to_string(),
            fallback_label: "normal".to_string(),
            notify_channel: "digest".to_string(),
        }
    }
}

/// Parameters extracted from a solution description; absent fields keep defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    #[serde(alias = "priority_threshold", alias = "score_threshold")]
    pub threshold: Option<f64>,
    #[serde(alias = "target_label")]
    pub label: Option<String>,
    pub fallback_label: Option<String>,
    #[serde(alias = "channel")]
    pub notify_channel: Option<String>,
}

impl AgentParameters {
    /// Applies `overrides` on top of `self`.
    ///
    /// Returns the merged parameters and the names of the parameters that
    /// fell back to their defaults. Thresholds given as percentages
    /// (`1 < t <= 100`) are scaled into `0..=1`; anything else out of range is
    /// ignored.
    pub fn apply(&self, overrides: &ParameterOverrides) -> (AgentParameters, Vec<&'static str>) {
        let mut merged = self.clone();
        let mut defaulted = Vec::new();

        let threshold = overrides.threshold.and_then(|t| match t {
            t if (0.0..=1.0).contains(&t) => Some(t),
            t if t > 1.0 && t <= 100.0 => Some(t / 100.0),
            _ => None,
        });
        match threshold {
            Some(t) => merged.threshold = t,
            None => defaulted.push("threshold"),
        }

        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match text(&overrides.label) {
            Some(v) => merged.label = v,
            None => defaulted.push("label"),
        }
        match text(&overrides.fallback_label) {
            Some(v) => merged.fallback_label = v,
            None => defaulted.push("fallback_label"),
        }
        match text(&overrides.notify_channel) {
            Some(v) => merged.notify_channel = v,
            None => defaulted.push("notify_channel"),
        }

        (merged, defaulted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTemplate {
    Prioritization,
    Classification,
    Reminder,
    /// analyze → decide → act fallback for unrecognized archetypes.
    Generic,
}

/// Graph plus the capability losses incurred while building it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub graph: AgentGraph,
    pub degradations: Vec<Degradation>,
}

impl AgentTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentTemplate::Prioritization => "prioritization",
            AgentTemplate::Classification => "classification",
            AgentTemplate::Reminder => "reminder",
            AgentTemplate::Generic => "generic",
        }
    }

    /// Tools the template binds whenever the catalog offers them.
    pub fn tools(&self) -> &'static [&'static str] {
        match self {
            AgentTemplate::Prioritization => &[READ_ITEM, SCORE_PRIORITY, APPLY_LABEL],
            AgentTemplate::Classification => &[READ_ITEM, CLASSIFY, APPLY_LABEL],
            AgentTemplate::Reminder => &[READ_ITEM, SCORE_PRIORITY, NOTIFY],
            AgentTemplate::Generic => &[READ_ITEM],
        }
    }

    fn analysis_tools(&self) -> &'static [&'static str] {
        match self {
            AgentTemplate::Prioritization | AgentTemplate::Reminder => {
                &[READ_ITEM, SCORE_PRIORITY]
            }
            AgentTemplate::Classification => &[READ_ITEM, CLASSIFY],
            AgentTemplate::Generic => &[READ_ITEM],
        }
    }

    /// Builds the execution graph for `params` given the `bound` tools.
    pub fn assemble(
        &self,
        params: &AgentParameters,
        bound: &BTreeSet<ToolId>,
    ) -> Result<Assembly, GraphValidationError> {
        let has = |name: &str| bound.contains(&ToolId::new(name));
        let mut degradations = Vec::new();

        let mut analysis: Vec<ToolId> = Vec::new();
        for tool in self.analysis_tools() {
            if has(tool) {
                analysis.push(ToolId::new(*tool));
            } else {
                degradations.push(Degradation::new(
                    *tool,
                    "tool unavailable; analysis runs without it",
                ));
            }
        }
        // Generic agents opportunistically score when the solution asked for it
        if *self == AgentTemplate::Generic && has(SCORE_PRIORITY) {
            analysis.push(ToolId::new(SCORE_PRIORITY));
        }
        let scored = analysis.iter().any(|t| t.as_str() == SCORE_PRIORITY);

        let builder = AgentGraph::builder()
            .node("analyze", NodeKind::Analyze { tools: analysis })
            .node("decide", NodeKind::Decide)
            .edge("analyze", "decide", EdgeCondition::Always);

        let builder = match self {
            AgentTemplate::Classification => {
                let primary = bind_action(
                    AgentAction::ApplyLabel {
                        label: params.label.clone(),
                    },
                    bound,
                    &mut degradations,
                );
                let fallback = bind_action(
                    AgentAction::ApplyLabel {
                        label: params.fallback_label.clone(),
                    },
                    bound,
                    &mut degradations,
                );
                let builder = if has(CLASSIFY) {
                    builder
                        .node("act-label", NodeKind::Act { action: primary })
                        .edge(
                            "decide",
                            "act-label",
                            EdgeCondition::LabelIs {
                                label: params.label.clone(),
                            },
                        )
                } else {
                    builder
                };
                builder
                    .node("act-label-fallback", NodeKind::Act { action: fallback })
                    .edge("decide", "act-label-fallback", EdgeCondition::Always)
            }
            AgentTemplate::Prioritization | AgentTemplate::Reminder | AgentTemplate::Generic => {
                let (act_id, action) = match self {
                    AgentTemplate::Prioritization => (
                        "act-label",
                        AgentAction::ApplyLabel {
                            label: params.label.clone(),
                        },
                    ),
                    AgentTemplate::Reminder => (
                        "act-notify",
                        AgentAction::Notify {
                            channel: params.notify_channel.clone(),
                        },
                    ),
                    _ => ("act-process", generic_action(params, bound, &mut degradations)),
                };
                let action = bind_action(action, bound, &mut degradations);
                let skip = NodeKind::Act {
                    action: AgentAction::Skip {
                        reason: Some("score at or below threshold".to_string()),
                    },
                };
                match (scored, self) {
                    (true, _) => builder
                        .node(act_id, NodeKind::Act { action })
                        .node("act-skip", skip)
                        .edge(
                            "decide",
                            act_id,
                            EdgeCondition::ScoreAbove {
                                threshold: params.threshold,
                            },
                        )
                        .edge(
                            "decide",
                            "act-skip",
                            EdgeCondition::ScoreAtMost {
                                threshold: params.threshold,
                            },
                        ),
                    // Unscored generic agents act on every item
                    (false, AgentTemplate::Generic) => builder
                        .node(act_id, NodeKind::Act { action })
                        .edge("decide", act_id, EdgeCondition::Always),
                    (false, _) => builder
                        .node(
                            "act-skip",
                            NodeKind::Act {
                                action: AgentAction::Skip {
                                    reason: Some("no priority score available".to_string()),
                                },
                            },
                        )
                        .edge("decide", "act-skip", EdgeCondition::Always),
                }
            }
        };

        Ok(Assembly {
            graph: builder.build()?,
            degradations,
        })
    }
}

fn generic_action(
    params: &AgentParameters,
    bound: &BTreeSet<ToolId>,
    degradations: &mut Vec<Degradation>,
) -> AgentAction {
    if bound.contains(&ToolId::new(APPLY_LABEL)) {
        AgentAction::ApplyLabel {
            label: params.label.clone(),
        }
    } else if bound.contains(&ToolId::new(NOTIFY)) {
        AgentAction::Notify {
            channel: params.notify_channel.clone(),
        }
    } else {
        degradations.push(Degradation::new("action", "no action tool bound"));
        AgentAction::Skip {
            reason: Some("no action tool bound".to_string()),
        }
    }
}

/// Downgrades `action` to a skip when its tool is not bound.
fn bind_action(
    action: AgentAction,
    bound: &BTreeSet<ToolId>,
    degradations: &mut Vec<Degradation>,
) -> AgentAction {
    match action.tool() {
        Some(tool) if !bound.contains(&tool) => {
            let reason = format!("{} unavailable", tool);
            if !degradations.iter().any(|d| d.capability == tool.as_str()) {
                degradations.push(Degradation::new(tool.as_str(), "tool unavailable; action skipped"));
            }
            AgentAction::Skip {
                reason: Some(reason),
            }
        }
        _ => action,
    }
}

/// Maps solution archetypes to templates; unknown archetypes get [`AgentTemplate::Generic`].
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<SolutionArchetype, AgentTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
            .register(SolutionArchetype::Prioritization, AgentTemplate::Prioritization)
            .register(SolutionArchetype::Classification, AgentTemplate::Classification)
            .register(SolutionArchetype::Reminder, AgentTemplate::Reminder)
    }
}

impl TemplateRegistry {
    /// An empty registry; everything resolves to the generic template.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn register(mut self, archetype: SolutionArchetype, template: AgentTemplate) -> Self {
        self.templates.insert(archetype, template);
        self
    }

    pub fn resolve(&self, archetype: &SolutionArchetype) -> AgentTemplate {
        self.templates
            .get(archetype)
            .copied()
            .unwrap_or(AgentTemplate::Generic)
    }
}

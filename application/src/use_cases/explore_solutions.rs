//! Solution exploration stage.
//!
//! Requests exactly `count` solutions. When fewer valid entries come back the
//! request is retried once and the richer attempt wins; a partial set is then
//! accepted. Zero valid solutions after the retry fails the stage.

use super::shared::{InferenceClient, InferenceError, StageError};
use crate::ports::inference_gateway::InferenceGateway;
use gapwise_domain::inference::{ParsedSolutions, parse_solutions};
use gapwise_domain::{Problem, PromptTemplate, Solution, SolutionSet};
use tracing::{debug, info, warn};

/// Input for one exploration round.
#[derive(Debug, Clone)]
pub struct ExploreInput<'a> {
    pub problem: &'a Problem,
    /// 1 for the first proposal, incremented on every re-exploration.
    pub round: u32,
    /// Names of solutions already proposed; never proposed again.
    pub exclude: Vec<String>,
    pub available_tools: Vec<String>,
}

pub struct ExploreSolutionsUseCase<G: InferenceGateway + 'static> {
    client: InferenceClient<G>,
    count: usize,
}

impl<G: InferenceGateway + 'static> ExploreSolutionsUseCase<G> {
    pub fn new(client: InferenceClient<G>, count: usize) -> Self {
        Self {
            client,
            count: count.max(1),
        }
    }

    pub async fn execute(&self, input: ExploreInput<'_>) -> Result<SolutionSet, StageError> {
        let prefix = format!("{}-r{}", input.problem.id, input.round);

        // Only malformed or short answers are retried; transport failures are not
        let first = match self.attempt(&input, &prefix, false).await {
            Ok(solutions) if solutions.len() >= self.count => Some(solutions),
            Ok(solutions) => {
                warn!(
                    "Exploration returned {} of {} valid solutions, retrying",
                    solutions.len(),
                    self.count
                );
                Some(solutions)
            }
            Err(e @ InferenceError::Malformed { .. }) => {
                warn!("Exploration failed ({}), retrying", e);
                None
            }
            Err(e) => return Err(StageError::Inference(e)),
        };

        let best = match first {
            Some(solutions) if solutions.len() >= self.count => solutions,
            first => {
                let second = match self.attempt(&input, &prefix, true).await {
                    Ok(solutions) => solutions,
                    Err(e @ InferenceError::Malformed { .. }) => {
                        debug!("Retry malformed: {}", e);
                        Vec::new()
                    }
                    Err(e) => {
                        // A usable first attempt survives a failed retry
                        if first.as_ref().is_some_and(|s| !s.is_empty()) {
                            warn!("Exploration retry failed ({}), keeping partial set", e);
                            Vec::new()
                        } else {
                            return Err(StageError::Inference(e));
                        }
                    }
                };
                match first {
                    Some(first) if first.len() >= second.len() => first,
                    _ => second,
                }
            }
        };

        let mut solutions = best;
        solutions.truncate(self.count);
        if solutions.is_empty() {
            return Err(StageError::NoSolutions);
        }

        info!(
            "Round {} proposed {} solutions for {}",
            input.round,
            solutions.len(),
            input.problem.id
        );
        Ok(SolutionSet::new(
            input.problem.id.clone(),
            input.round,
            solutions,
        ))
    }

    /// One inference call; returns the valid, non-excluded solutions.
    async fn attempt(
        &self,
        input: &ExploreInput<'_>,
        prefix: &str,
        strict: bool,
    ) -> Result<Vec<Solution>, InferenceError> {
        let mut request = PromptTemplate::exploration(
            input.problem,
            self.count,
            &input.exclude,
            &input.available_tools,
        );
        if strict {
            request = request.stricter();
        }

        let text = self.client.call_once(&request).await?;
        let ParsedSolutions { solutions, dropped } =
            parse_solutions(&text, prefix).map_err(|e| InferenceError::Malformed {
                schema: request.schema,
                message: e.to_string(),
            })?;
        if dropped > 0 {
            debug!("Dropped {} solutions missing a name or description", dropped);
        }

        let excluded: Vec<String> = input.exclude.iter().map(|n| n.to_lowercase()).collect();
        Ok(solutions
            .into_iter()
            .filter(|s| {
                let keep = !excluded.contains(&s.name.to_lowercase());
                if !keep {
                    debug!("Dropped previously proposed solution '{}'", s.name);
                }
                keep
            })
            .collect())
    }
}

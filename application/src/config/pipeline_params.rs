//! Pipeline parameters: use case control.
//!
//! [`PipelineParams`] groups the static parameters that control the stages of
//! [`RunPipelineUseCase`](crate::use_cases::run_pipeline::RunPipelineUseCase).

use gapwise_domain::{AgentParameters, LearningPolicy};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Solutions requested per exploration round.
    pub solution_count: usize,
    /// Items processed concurrently by the agent executor.
    pub max_concurrency: usize,
    /// Bound on every inference call.
    pub inference_timeout: Duration,
    /// Parameters agents fall back to when extraction yields nothing.
    pub agent_defaults: AgentParameters,
    pub learning: LearningPolicy,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            solution_count: 3,
            max_concurrency: 4,
            inference_timeout: Duration::from_secs(60),
            agent_defaults: AgentParameters::default(),
            learning: LearningPolicy::default(),
        }
    }
}

impl PipelineParams {
    // ==================== Builder Methods ====================

    pub fn with_solution_count(mut self, count: usize) -> Self {
        self.solution_count = count.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    pub fn with_agent_defaults(mut self, defaults: AgentParameters) -> Self {
        self.agent_defaults = defaults;
        self
    }

    pub fn with_learning(mut self, policy: LearningPolicy) -> Self {
        self.learning = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PipelineParams::default();
        assert_eq!(params.solution_count, 3);
        assert_eq!(params.agent_defaults.threshold, 0.5);
    }

    #[test]
    fn test_builders_clamp_to_one() {
        let params = PipelineParams::default()
            .with_solution_count(0)
            .with_max_concurrency(0)
            .with_inference_timeout(Duration::from_secs(5));
        assert_eq!(params.solution_count, 1);
        assert_eq!(params.max_concurrency, 1);
        assert_eq!(params.inference_timeout, Duration::from_secs(5));
    }
}

//! Expectation synthesis stage.

use super::shared::{InferenceClient, InferenceError, StageError};
use crate::ports::inference_gateway::InferenceGateway;
use gapwise_domain::inference::parse_expectation;
use gapwise_domain::{ContextSnapshot, Expectation, PromptTemplate, WorldModel};
use tracing::info;

/// Asks inference what "ideal" looks like for this snapshot.
///
/// A response that is still malformed after the strict retry becomes
/// [`StageError::ExpectationUnavailable`]; timeouts and gateway errors pass
/// through unchanged.
pub struct SynthesizeExpectationUseCase<G: InferenceGateway + 'static> {
    client: InferenceClient<G>,
}

impl<G: InferenceGateway + 'static> SynthesizeExpectationUseCase<G> {
    pub fn new(client: InferenceClient<G>) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        model: &WorldModel,
        snapshot: &ContextSnapshot,
    ) -> Result<Expectation, StageError> {
        let request = PromptTemplate::expectation(model, snapshot);
        let expectation = self
            .client
            .request(request, parse_expectation)
            .await
            .map_err(|e| match e {
                InferenceError::Malformed { message, .. } => {
                    StageError::ExpectationUnavailable(message)
                }
                other => StageError::Inference(other),
            })?;

        info!(
            "Expectation synthesized with {} criteria",
            expectation.criteria.len()
        );
        Ok(expectation)
    }
}

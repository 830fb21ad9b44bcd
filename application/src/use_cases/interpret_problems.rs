//! Problem interpretation stage.
//!
//! One inference call per gap, all gaps in parallel. A gap whose analysis
//! stays malformed after the retry still yields a problem, named after the
//! gap and flagged `low_confidence`; only timeouts and gateway errors fail
//! the stage.

use super::shared::{InferenceClient, InferenceError, StageError};
use crate::ports::inference_gateway::InferenceGateway;
use crate::ports::progress::PipelineProgressNotifier;
use gapwise_domain::inference::parse_problem_analysis;
use gapwise_domain::{ContextSnapshot, Gap, Problem, ProblemAnalysis, PromptTemplate, Stage};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub struct InterpretProblemsUseCase<G: InferenceGateway + 'static> {
    client: InferenceClient<G>,
}

impl<G: InferenceGateway + 'static> InterpretProblemsUseCase<G> {
    pub fn new(client: InferenceClient<G>) -> Self {
        Self { client }
    }

    /// Returns one problem per gap, in gap order.
    pub async fn execute(
        &self,
        gaps: &[Gap],
        snapshot: &ContextSnapshot,
        progress: &dyn PipelineProgressNotifier,
    ) -> Result<Vec<Problem>, StageError> {
        let snapshot = Arc::new(snapshot.clone());
        let mut join_set = JoinSet::new();

        for (index, gap) in gaps.iter().enumerate() {
            let client = self.client.clone();
            let snapshot = Arc::clone(&snapshot);
            let gap = gap.clone();

            join_set.spawn(async move {
                let request = PromptTemplate::interpretation(&gap, &snapshot);
                let result = client.request(request, parse_problem_analysis).await;
                (index, gap, result)
            });
        }

        let mut problems: Vec<Option<Problem>> = vec![None; gaps.len()];
        let mut failure: Option<InferenceError> = None;

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((index, gap, Ok(analysis))) => {
                    let problem = Problem::from_analysis(&gap, analysis);
                    if problem.low_confidence {
                        warn!(
                            "Interpretation of {} incomplete; cause or impact unknown",
                            gap.id
                        );
                        progress.on_degraded(
                            Stage::Interpretation,
                            &format!("{}: interpretation incomplete", gap.id),
                        );
                    }
                    progress.on_item_processed(Stage::Interpretation, gap.id.as_str(), true);
                    problems[index] = Some(problem);
                }
                Ok((index, gap, Err(InferenceError::Malformed { message, .. }))) => {
                    warn!("Interpretation of {} malformed: {}", gap.id, message);
                    progress.on_item_processed(Stage::Interpretation, gap.id.as_str(), false);
                    problems[index] = Some(Problem::from_analysis(&gap, ProblemAnalysis::default()));
                }
                Ok((_, gap, Err(e))) => {
                    warn!("Interpretation of {} failed: {}", gap.id, e);
                    progress.on_item_processed(Stage::Interpretation, gap.id.as_str(), false);
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    warn!("Interpretation task panicked: {}", e);
                }
            }
        }

        if let Some(e) = failure {
            return Err(StageError::Inference(e));
        }

        // A panicked task leaves its slot empty; fall back to a placeholder
        let problems: Vec<Problem> = problems
            .into_iter()
            .zip(gaps)
            .map(|(problem, gap)| {
                problem.unwrap_or_else(|| Problem::from_analysis(gap, ProblemAnalysis::default()))
            })
            .collect();

        info!(
            "Interpreted {} problems ({} low confidence)",
            problems.len(),
            problems.iter().filter(|p| p.low_confidence).count()
        );
        Ok(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::inference_gateway::GatewayError;
    use crate::ports::progress::NoProgress;
    use crate::test_support::{ScriptedGateway, unread_items};
    use chrono::Utc;
    use gapwise_domain::{OutputSchema, Severity};
    use std::time::Duration;

    fn gaps() -> Vec<Gap> {
        vec![
            Gap::new("gap-1", "unread exceeds ideal by 3", Severity::High),
            Gap::new("gap-2", "calendar is overbooked", Severity::Low),
        ]
    }

    async fn interpret(gateway: ScriptedGateway) -> Result<Vec<Problem>, StageError> {
        let use_case = InterpretProblemsUseCase::new(InferenceClient::new(
            Arc::new(gateway),
            Duration::from_millis(50),
        ));
        let snapshot = ContextSnapshot::new(unread_items(3), Utc::now().fixed_offset());
        use_case.execute(&gaps(), &snapshot, &NoProgress).await
    }

    #[tokio::test]
    async fn test_one_problem_per_gap_in_order() {
        let gateway = ScriptedGateway::new().respond(
            OutputSchema::ProblemAnalysis,
            r#"{"name": "overload", "detail": "d", "cause": "c", "impact": "i"}"#,
        );
        let problems = interpret(gateway).await.unwrap();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].gap_id.as_str(), "gap-1");
        assert_eq!(problems[1].gap_id.as_str(), "gap-2");
        assert_eq!(problems[1].severity, Severity::Low);
        assert!(!problems[0].low_confidence);
    }

    #[tokio::test]
    async fn test_missing_cause_is_low_confidence() {
        let gateway = ScriptedGateway::new().respond(
            OutputSchema::ProblemAnalysis,
            r#"{"name": "overload", "impact": "missed mail"}"#,
        );
        let problems = interpret(gateway).await.unwrap();
        assert!(problems.iter().all(|p| p.low_confidence));
        assert_eq!(problems[0].cause, Problem::UNKNOWN);
        assert_eq!(problems[0].impact, "missed mail");
    }

    #[tokio::test]
    async fn test_malformed_yields_placeholder() {
        let gateway = ScriptedGateway::new().respond(OutputSchema::ProblemAnalysis, "???");
        let problems = interpret(gateway).await.unwrap();
        assert_eq!(problems[0].name, "unread exceeds ideal by 3");
        assert!(problems[0].low_confidence);
    }

    #[tokio::test]
    async fn test_gateway_error_fails_stage() {
        let gateway = ScriptedGateway::new().fail(
            OutputSchema::ProblemAnalysis,
            GatewayError::ModelNotAvailable("m".into()),
        );
        let err = interpret(gateway).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::Inference(InferenceError::Gateway(_))
        ));
    }
}

//! Gap comparison stage.

use super::shared::{InferenceClient, StageError};
use crate::ports::inference_gateway::InferenceGateway;
use gapwise_domain::inference::parse_gaps;
use gapwise_domain::{ContextSnapshot, Expectation, Gap, PromptTemplate, rank_gaps};
use tracing::{info, warn};

/// Compares the expectation with the snapshot and ranks the gaps found.
///
/// Output is sorted by severity, most severe first; ties keep detection order.
/// An empty result is valid and ends the run without gaps. Related item refs
/// are restricted to items present in the snapshot.
pub struct CompareGapsUseCase<G: InferenceGateway + 'static> {
    client: InferenceClient<G>,
}

impl<G: InferenceGateway + 'static> CompareGapsUseCase<G> {
    pub fn new(client: InferenceClient<G>) -> Self {
        Self { client }
    }

    pub async fn execute(
        &self,
        expectation: &Expectation,
        snapshot: &ContextSnapshot,
    ) -> Result<Vec<Gap>, StageError> {
        let request = PromptTemplate::gaps(expectation, snapshot);
        let mut gaps = self.client.request(request, parse_gaps).await?;
        for gap in &mut gaps {
            let related = std::mem::take(&mut gap.related_items);
            let (known, unknown): (Vec<String>, Vec<String>) = related
                .into_iter()
                .partition(|id| snapshot.item(id).is_some());
            if !unknown.is_empty() {
                warn!("Gap {} referenced unknown items {:?}", gap.id, unknown);
            }
            gap.related_items = known;
        }
        rank_gaps(&mut gaps);
        info!("Comparison found {} gaps", gaps.len());
        Ok(gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedGateway, unread_items};
    use chrono::Utc;
    use gapwise_domain::{Criterion, FailureKind, OutputSchema, Severity};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn expectation() -> Expectation {
        Expectation {
            ideal_description: "calm inbox".into(),
            criteria: vec![Criterion::new("inbox", "unread_count", json!(5))],
        }
    }

    async fn compare_with(gateway: Arc<ScriptedGateway>) -> Result<Vec<Gap>, StageError> {
        let use_case =
            CompareGapsUseCase::new(InferenceClient::new(gateway, Duration::from_secs(1)));
        let snapshot = ContextSnapshot::new(unread_items(8), Utc::now().fixed_offset());
        use_case.execute(&expectation(), &snapshot).await
    }

    async fn compare(response: &str) -> Result<Vec<Gap>, StageError> {
        compare_with(Arc::new(ScriptedGateway::new().respond(OutputSchema::Gaps, response))).await
    }

    #[tokio::test]
    async fn test_gaps_sorted_by_severity_with_stable_ties() {
        let gaps = compare(
            r#"[{"description": "a", "severity": "low"},
                {"description": "b", "severity": "high"},
                {"description": "c", "severity": "medium"},
                {"description": "d", "severity": "high"}]"#,
        )
        .await
        .unwrap();
        let order: Vec<&str> = gaps.iter().map(|g| g.description.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "c", "a"]);
        assert_eq!(gaps[0].severity, Severity::High);
        assert_eq!(gaps[0].id.as_str(), "gap-2");
    }

    #[tokio::test]
    async fn test_single_object_accepted() {
        let gaps = compare(r#"{"description": "unread exceeds ideal by 3", "severity": "high"}"#)
            .await
            .unwrap();
        assert_eq!(gaps.len(), 1);
    }

    #[tokio::test]
    async fn test_no_gaps() {
        assert!(compare("[]").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_entries_without_description_retry_then_fail() {
        let gateway = Arc::new(ScriptedGateway::new().respond(
            OutputSchema::Gaps,
            r#"[{"issue": "unread exceeds ideal by 3", "severity": "high"}]"#,
        ));
        let err = compare_with(gateway.clone()).await.unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::InferenceMalformed);
        let calls = gateway.requests_for(OutputSchema::Gaps);
        assert_eq!(calls.len(), 2);
        assert!(calls[1].strict);
    }

    #[tokio::test]
    async fn test_unknown_related_items_dropped() {
        let gaps = compare(
            r#"[{"description": "unread exceeds ideal by 3", "severity": "high",
                 "related_items": ["m1", "ghost-99", "m3"]}]"#,
        )
        .await
        .unwrap();
        assert_eq!(gaps[0].related_items, vec!["m1", "m3"]);
    }
}

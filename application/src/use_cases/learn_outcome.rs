//! Outcome learning stage.
//!
//! Folds execution feedback (or a rejection) into the shared world model and
//! persists it. The write lock is held only while folding; the save works on
//! a clone taken under the lock.

use super::shared::WorldModelHandle;
use crate::ports::world_model_store::{StoreError, WorldModelStore};
use chrono::{DateTime, Utc};
use gapwise_domain::learning::{fold_execution, fold_rejection};
use gapwise_domain::{
    ContextSnapshot, ExecutionResult, FeedbackMap, Gap, LearningPolicy, LearningReport,
    SolutionArchetype,
};
use std::sync::Arc;
use tracing::{error, info};

/// Report plus the save failure, if any. A failed save never discards the
/// in-memory update.
#[derive(Debug, Clone)]
pub struct LearningOutcome {
    pub report: LearningReport,
    pub persistence_error: Option<StoreError>,
}

pub struct LearnOutcomeUseCase {
    world: WorldModelHandle,
    store: Arc<dyn WorldModelStore>,
    policy: LearningPolicy,
}

impl LearnOutcomeUseCase {
    pub fn new(world: WorldModelHandle, store: Arc<dyn WorldModelStore>) -> Self {
        Self {
            world,
            store,
            policy: LearningPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LearningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn learn_execution(
        &self,
        snapshot: &ContextSnapshot,
        gap: Option<&Gap>,
        result: &ExecutionResult,
        feedback: &FeedbackMap,
        now: DateTime<Utc>,
    ) -> LearningOutcome {
        let (report, model) = self
            .world
            .update(|model| {
                let report =
                    fold_execution(model, &self.policy, snapshot, gap, result, feedback, now);
                (report, model.clone())
            })
            .await;

        info!(
            "Learned from {} items: accuracy {}, {} patterns, {} threshold adjustments",
            result.per_item.len(),
            report
                .accuracy
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "n/a".to_string()),
            report.patterns_updated.len(),
            report.adjustments.len()
        );
        self.persist(report, &model).await
    }

    pub async fn learn_rejection(
        &self,
        snapshot: &ContextSnapshot,
        gap: Option<&Gap>,
        archetype: &SolutionArchetype,
        reason: &str,
        now: DateTime<Utc>,
    ) -> LearningOutcome {
        let (report, model) = self
            .world
            .update(|model| {
                let report =
                    fold_rejection(model, &self.policy, snapshot, gap, archetype, reason, now);
                (report, model.clone())
            })
            .await;

        info!(
            "Learned from rejection of {} solution: {} threshold adjustments",
            archetype,
            report.adjustments.len()
        );
        self.persist(report, &model).await
    }

    async fn persist(
        &self,
        report: LearningReport,
        model: &gapwise_domain::WorldModel,
    ) -> LearningOutcome {
        if report.is_noop() {
            return LearningOutcome {
                report,
                persistence_error: None,
            };
        }
        let persistence_error = match self.store.save(model).await {
            Ok(()) => None,
            Err(e) => {
                error!("Failed to save world model: {}", e);
                Some(e)
            }
        };
        LearningOutcome {
            report,
            persistence_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryWorldModelStore;
    use gapwise_domain::{
        AgentId, Feedback, IdealState, ItemOutcome, NodeId, PatternKey, Severity, WorldModel,
    };

    fn model() -> WorldModel {
        let mut model = WorldModel::default();
        model.upsert_ideal_state(IdealState::new("inbox", "unread_count", 5.0));
        model
    }

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot::new(
            Vec::new(),
            DateTime::parse_from_rfc3339("2026-03-02T09:15:00+00:00").unwrap(),
        )
    }

    fn gap() -> Gap {
        Gap::new("gap-1", "unread exceeds ideal by 3", Severity::High)
            .with_target("inbox", Some("unread_count".to_string()))
    }

    fn result() -> ExecutionResult {
        let path = vec![NodeId::new("analyze")];
        ExecutionResult::new(
            AgentId::new("a"),
            vec![
                ItemOutcome::applied("m1", "label:important".into(), path.clone()),
                ItemOutcome::applied("m2", "skip".into(), path),
            ],
        )
    }

    #[tokio::test]
    async fn test_learn_execution_saves_model() {
        let world = WorldModelHandle::new(model());
        let store = Arc::new(MemoryWorldModelStore::default());
        let use_case = LearnOutcomeUseCase::new(world.clone(), store.clone());

        let mut feedback = FeedbackMap::new();
        feedback.insert("m1", Feedback::Confirmed);
        feedback.insert(
            "m2",
            Feedback::Corrected {
                expected: "label:important".into(),
            },
        );

        let outcome = use_case
            .learn_execution(&snapshot(), Some(&gap()), &result(), &feedback, Utc::now())
            .await;

        assert_eq!(outcome.report.accuracy, Some(0.5));
        assert!(outcome.persistence_error.is_none());
        assert_eq!(store.save_count(), 1);

        let key = PatternKey::at(&snapshot().current_time());
        assert!(world.read().await.pattern(&key).is_some());
        assert_eq!(store.saved(), world.read().await);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported_not_lost() {
        let world = WorldModelHandle::new(model());
        let store = Arc::new(MemoryWorldModelStore::failing());
        let use_case = LearnOutcomeUseCase::new(world.clone(), store);

        let outcome = use_case
            .learn_rejection(
                &snapshot(),
                Some(&gap()),
                &SolutionArchetype::Prioritization,
                "too noisy",
                Utc::now(),
            )
            .await;

        assert!(matches!(outcome.persistence_error, Some(StoreError::Io(_))));
        let threshold = world
            .read()
            .await
            .ideal_state("inbox", "unread_count")
            .unwrap()
            .threshold;
        assert!(threshold > 5.0);
    }
}

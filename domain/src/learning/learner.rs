//! Folding execution outcomes and rejections into the world model.
//!
//! These are pure functions over `&mut WorldModel`; the application layer
//! decides when to take the write lock and when to persist.

use crate::context::snapshot::ContextSnapshot;
use crate::execution::result::ExecutionResult;
use crate::learning::feedback::{Feedback, FeedbackMap, accuracy};
use crate::learning::policy::LearningPolicy;
use crate::learning::report::{LearningReport, ThresholdAdjustment};
use crate::pipeline::gap::Gap;
use crate::pipeline::solution::SolutionArchetype;
use crate::world::entities::WorldModel;
use crate::world::pattern::{PatternEntry, PatternKey};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Folds one executed batch into `model`.
///
/// Every succeeded item contributes its applied action to the pattern for its
/// `(weekday, hour-bucket)`; thresholds of the ideal states behind `gap` are
/// recalibrated when feedback was given. Goals and preferences are untouched.
pub fn fold_execution(
    model: &mut WorldModel,
    policy: &LearningPolicy,
    snapshot: &ContextSnapshot,
    gap: Option<&Gap>,
    result: &ExecutionResult,
    feedback: &FeedbackMap,
    now: DateTime<Utc>,
) -> LearningReport {
    let snapshot_time = snapshot.current_time();
    let mut slots: BTreeMap<PatternKey, (PatternEntry, Vec<&Feedback>)> = BTreeMap::new();

    for outcome in &result.per_item {
        let Some(action) = outcome.applied_action.as_deref() else {
            continue;
        };
        let at = snapshot
            .item(&outcome.item_ref)
            .and_then(|item| item.received_at())
            .unwrap_or(snapshot_time);
        let (entry, verdicts) = slots.entry(PatternKey::at(&at)).or_default();
        entry.record(action, at);
        if let Some(verdict) = feedback.get(&outcome.item_ref) {
            verdicts.push(verdict);
        }
    }

    let mut report = LearningReport {
        accuracy: feedback.accuracy(),
        feedback_count: feedback.len(),
        ..LearningReport::default()
    };

    for (key, (mut entry, verdicts)) in slots {
        entry.accuracy = accuracy(verdicts);
        model.merge_pattern(key, &entry);
        report.patterns_updated.push(key);
    }

    if let (Some(acc), Some(gap)) = (report.accuracy, gap) {
        report.adjustments = recalibrate(model, policy, gap, acc);
    }

    if !report.is_noop() {
        model.touch(now);
    }
    report
}

/// Folds a rejected solution in as negative feedback.
///
/// Records `rejected:<archetype>` under the snapshot's slot and moves the
/// related thresholds by the step for accuracy 0.
pub fn fold_rejection(
    model: &mut WorldModel,
    policy: &LearningPolicy,
    snapshot: &ContextSnapshot,
    gap: Option<&Gap>,
    archetype: &SolutionArchetype,
    reason: &str,
    now: DateTime<Utc>,
) -> LearningReport {
    let at = snapshot.current_time();
    let key = PatternKey::at(&at);
    let mut entry = PatternEntry::default();
    entry.record(&format!("rejected:{}", archetype.as_str()), at);
    entry.accuracy = Some(0.0);
    model.merge_pattern(key, &entry);

    let adjustments = gap
        .map(|gap| recalibrate(model, policy, gap, 0.0))
        .unwrap_or_default();
    model.touch(now);

    LearningReport {
        accuracy: Some(0.0),
        feedback_count: 0,
        patterns_updated: vec![key],
        adjustments,
        rejection: Some(reason.to_string()),
    }
}

fn recalibrate(
    model: &mut WorldModel,
    policy: &LearningPolicy,
    gap: &Gap,
    accuracy: f64,
) -> Vec<ThresholdAdjustment> {
    let Some(domain) = gap.domain.as_deref() else {
        return Vec::new();
    };
    let targets: Vec<_> = model
        .ideal_states()
        .iter()
        .filter(|s| s.matches(domain, gap.condition.as_deref()))
        .map(|s| {
            (
                s.domain.clone(),
                s.condition.clone(),
                policy.next_threshold(s.threshold, accuracy, s.comparison),
            )
        })
        .collect();

    let mut adjustments = Vec::new();
    for (domain, condition, to) in targets {
        if let Some(from) = model.adjust_threshold(&domain, &condition, to)
            && from != to
        {
            adjustments.push(ThresholdAdjustment {
                domain,
                condition,
                from,
                to,
            });
        }
    }
    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::snapshot::SensedItem;
    use crate::core::ids::{AgentId, GapId};
    use crate::execution::result::ItemOutcome;
    use crate::pipeline::gap::Severity;
    use crate::world::entities::{Goal, GoalPriority, IdealState};
    use crate::world::pattern::HourBucket;
    use chrono::{FixedOffset, TimeZone, Weekday};
    use serde_json::json;

    fn monday_morning() -> DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 3, 9, 0, 0)
            .unwrap()
    }

    fn model() -> WorldModel {
        let mut model = WorldModel::default();
        model.add_goal(Goal::new(
            "Inbox zero",
            GoalPriority::High,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        model.upsert_ideal_state(IdealState::new("inbox", "unread_count", 5.0));
        model.upsert_ideal_state(IdealState::new("calendar", "meetings", 4.0));
        model
    }

    fn gap() -> Gap {
        Gap::new(GapId::new("gap-1"), "unread exceeds ideal by 3", Severity::High)
            .with_target("inbox", Some("unread_count".to_string()))
    }

    fn snapshot() -> ContextSnapshot {
        ContextSnapshot::new(
            vec![
                SensedItem::new("m1", json!({"read": false})),
                // Tuesday evening
                SensedItem::new(
                    "m2",
                    json!({"read": false, "received_at": "2024-06-04T19:30:00+00:00"}),
                ),
            ],
            monday_morning(),
        )
    }

    fn result() -> ExecutionResult {
        ExecutionResult::new(
            AgentId::new("agent-1"),
            vec![
                ItemOutcome::applied("m1", "label:important".into(), vec![]),
                ItemOutcome::applied("m2", "skip".into(), vec![]),
            ],
        )
    }

    #[test]
    fn test_fold_execution_updates_patterns_and_thresholds() {
        let mut model = model();
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let report = fold_execution(
            &mut model,
            &LearningPolicy::default(),
            &snapshot(),
            Some(&gap()),
            &result(),
            &FeedbackMap::confirm_all(["m1", "m2"]),
            now,
        );

        assert_eq!(report.accuracy, Some(1.0));
        assert_eq!(report.patterns_updated.len(), 2);
        let monday = model
            .pattern(&PatternKey::new(Weekday::Mon, HourBucket::Morning))
            .unwrap();
        assert_eq!(monday.action_counts["label:important"], 1);
        assert_eq!(monday.accuracy, Some(1.0));
        assert!(
            model
                .pattern(&PatternKey::new(Weekday::Tue, HourBucket::Evening))
                .is_some()
        );

        assert_eq!(report.adjustments.len(), 1);
        assert!((model.ideal_state("inbox", "unread_count").unwrap().threshold - 4.5).abs() < 1e-9);
        assert_eq!(model.ideal_state("calendar", "meetings").unwrap().threshold, 4.0);
        assert_eq!(model.goals().len(), 1);
        assert_eq!(model.updated_at(), Some(now));
    }

    #[test]
    fn test_fold_without_feedback_keeps_thresholds() {
        let mut model = model();
        let report = fold_execution(
            &mut model,
            &LearningPolicy::default(),
            &snapshot(),
            Some(&gap()),
            &result(),
            &FeedbackMap::new(),
            Utc::now(),
        );
        assert_eq!(report.accuracy, None);
        assert!(report.adjustments.is_empty());
        assert_eq!(model.ideal_state("inbox", "unread_count").unwrap().threshold, 5.0);
    }

    #[test]
    fn test_disjoint_runs_union_patterns() {
        let mut sequential = model();
        let mut first = FeedbackMap::new();
        first.insert("m1", Feedback::Confirmed);
        let mut second = FeedbackMap::new();
        second.insert(
            "m1",
            Feedback::Corrected {
                expected: "skip".into(),
            },
        );
        for feedback in [&first, &second] {
            fold_execution(
                &mut sequential,
                &LearningPolicy::default(),
                &snapshot(),
                None,
                &result(),
                feedback,
                Utc::now(),
            );
        }
        let key = PatternKey::new(Weekday::Mon, HourBucket::Morning);
        let entry = sequential.pattern(&key).unwrap();
        assert_eq!(entry.observations, 2);
        assert_eq!(entry.action_counts["label:important"], 2);
        assert_eq!(entry.accuracy, Some(0.5));
    }

    #[test]
    fn test_fold_rejection() {
        let mut model = model();
        let report = fold_rejection(
            &mut model,
            &LearningPolicy::default(),
            &snapshot(),
            Some(&gap()),
            &SolutionArchetype::Prioritization,
            "too aggressive",
            Utc::now(),
        );
        let entry = model
            .pattern(&PatternKey::new(Weekday::Mon, HourBucket::Morning))
            .unwrap();
        assert_eq!(entry.action_counts["rejected:prioritization"], 1);
        assert_eq!(report.rejection.as_deref(), Some("too aggressive"));
        assert!((model.ideal_state("inbox", "unread_count").unwrap().threshold - 5.5).abs() < 1e-9);
    }
}

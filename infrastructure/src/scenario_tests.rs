//! The inbox scenario run against the real adapters: offline inference,
//! builtin tools and JSON files in a temp directory.

use crate::inference::HeuristicGateway;
use crate::storage::{JsonCheckpointStore, JsonSensedItems, JsonWorldModelStore};
use crate::tools::BuiltinToolExecutor;
use gapwise_application::{
    AutoApproveCheckpoint, AutoRejectCheckpoint, CheckpointStore, RunPipelineUseCase,
    WorldModelHandle, WorldModelStore,
};
use gapwise_domain::{IdealState, PipelineState, Profile, Severity, WorldModel};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

struct Scenario {
    pipeline: RunPipelineUseCase<HeuristicGateway, BuiltinToolExecutor>,
    store: Arc<JsonWorldModelStore>,
    checkpoints: Arc<JsonCheckpointStore>,
}

async fn scenario(dir: &Path) -> Scenario {
    let mut model = WorldModel::new(Profile::new("Ada", "engineer"));
    model.upsert_ideal_state(IdealState::new("inbox", "unread_count", 5.0));
    let store = Arc::new(JsonWorldModelStore::new(dir.join("world_model.json")));
    store.save(&model).await.unwrap();

    let items: Vec<_> = (1..=8)
        .map(|i| json!({"id": format!("m{}", i), "subject": format!("mail {}", i), "read": false, "flagged": i % 2 == 0}))
        .collect();
    let inbox = dir.join("inbox.json");
    std::fs::write(&inbox, serde_json::to_vec(&items).unwrap()).unwrap();

    let checkpoints = Arc::new(JsonCheckpointStore::new(dir.join("runs")));
    let world = WorldModelHandle::new(store.load().await.unwrap());
    let pipeline = RunPipelineUseCase::new(
        Arc::new(HeuristicGateway::new()),
        Arc::new(BuiltinToolExecutor::new()),
        world,
        store.clone(),
        Arc::new(JsonSensedItems::new(inbox)),
    )
    .with_checkpoint_store(checkpoints.clone());

    Scenario {
        pipeline,
        store,
        checkpoints,
    }
}

#[tokio::test]
async fn test_inbox_scenario_offline() {
    let dir = tempfile::tempdir().unwrap();
    let s = scenario(dir.path()).await;

    let run = s
        .pipeline
        .run_to_completion(&AutoApproveCheckpoint)
        .await
        .unwrap();

    assert!(run.is_complete(), "run ended in {}", run.state());
    assert_eq!(run.gaps.len(), 1);
    assert_eq!(run.gaps[0].description, "unread exceeds ideal by 3");
    assert_eq!(run.gaps[0].severity, Severity::High);
    assert_eq!(run.problems[0].name, "inbox overload");
    assert_eq!(run.solutions.as_ref().unwrap().len(), 3);

    let agent = run.agent.as_ref().unwrap();
    let mut nodes = agent.nodes.clone();
    nodes.sort();
    assert_eq!(nodes, vec!["act-label", "act-skip", "analyze", "decide"]);
    assert!(!agent.is_degraded());

    let execution = run.execution.as_ref().unwrap();
    assert_eq!(execution.per_item.len(), 8);
    assert!(execution.per_item.iter().all(|o| o.succeeded));

    let report = run.learning.as_ref().unwrap();
    assert_eq!(report.patterns_updated.len(), 1);

    // The learned model and the finished run are both on disk
    let saved = s.store.load().await.unwrap();
    assert!(saved.pattern(&report.patterns_updated[0]).is_some());
    let latest = s.checkpoints.latest().await.unwrap().unwrap();
    assert_eq!(latest.id, run.id);
    assert_eq!(*latest.state(), PipelineState::Idle);
}

#[tokio::test]
async fn test_rejection_is_learned_offline() {
    let dir = tempfile::tempdir().unwrap();
    let s = scenario(dir.path()).await;

    let run = s
        .pipeline
        .run_to_completion(&AutoRejectCheckpoint)
        .await
        .unwrap();

    assert!(run.is_complete());
    assert!(run.execution.is_none());
    assert!(run.rejection.is_some());
}

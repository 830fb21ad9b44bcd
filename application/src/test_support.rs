//! In-memory port implementations shared by the application tests.

use crate::ports::checkpoint_store::CheckpointStore;
use crate::ports::human_checkpoint::{ApprovalDecision, CheckpointError, HumanCheckpointPort};
use crate::ports::inference_gateway::{GatewayError, InferenceGateway};
use crate::ports::inference_logger::{InferenceEvent, InferenceLogger};
use crate::ports::sensed_data::SensedDataSource;
use crate::ports::tool_executor::{ToolError, ToolExecutorPort};
use crate::ports::world_model_store::{StoreError, WorldModelStore};
use async_trait::async_trait;
use gapwise_domain::tool::builtin;
use gapwise_domain::{
    ExecutionResult, Feedback, FeedbackMap, InferenceRequest, Notice, OutputSchema,
    PipelineFailure, PipelineRun, Problem, RunId, SensedItem, SolutionSet, ToolCall, ToolCatalog,
    ToolOutput, WorldModel,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ==================== Gateway ====================

enum Scripted {
    Text(String),
    Fail(GatewayError),
    Hang,
}

/// Gateway answering from per-schema queues; the last answer repeats.
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<OutputSchema, VecDeque<Scripted>>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push(self, schema: OutputSchema, entry: Scripted) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(schema)
            .or_default()
            .push_back(entry);
        self
    }

    pub fn respond(self, schema: OutputSchema, text: impl Into<String>) -> Self {
        self.push(schema, Scripted::Text(text.into()))
    }

    pub fn fail(self, schema: OutputSchema, error: GatewayError) -> Self {
        self.push(schema, Scripted::Fail(error))
    }

    pub fn hang(self, schema: OutputSchema) -> Self {
        self.push(schema, Scripted::Hang)
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, schema: OutputSchema) -> Vec<InferenceRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.schema == schema)
            .collect()
    }

    fn next(&self, schema: OutputSchema) -> Option<Result<String, GatewayError>> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(&schema)?;
        let entry = if queue.len() > 1 {
            queue.pop_front()?
        } else {
            match queue.front()? {
                Scripted::Text(t) => Scripted::Text(t.clone()),
                Scripted::Fail(e) => Scripted::Fail(e.clone()),
                Scripted::Hang => Scripted::Hang,
            }
        };
        match entry {
            Scripted::Text(t) => Some(Ok(t)),
            Scripted::Fail(e) => Some(Err(e)),
            Scripted::Hang => None,
        }
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    async fn complete(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        let has_script = self.scripts.lock().unwrap().contains_key(&request.schema);
        if !has_script {
            return Err(GatewayError::Other(format!(
                "no script for {}",
                request.schema
            )));
        }
        match self.next(request.schema) {
            Some(result) => result,
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GatewayError::Timeout)
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Responses for the end-to-end inbox scenario.
pub fn inbox_gateway() -> ScriptedGateway {
    ScriptedGateway::new()
        .respond(
            OutputSchema::Expectation,
            r#"{"ideal_description": "inbox under control",
                "criteria": [{"domain": "inbox", "condition": "unread_count", "target_value": 5}]}"#,
        )
        .respond(
            OutputSchema::Gaps,
            r#"[{"description": "unread exceeds ideal by 3", "severity": "high",
                 "related_items": ["m1", "m2"], "domain": "inbox", "condition": "unread_count"}]"#,
        )
        .respond(
            OutputSchema::ProblemAnalysis,
            r#"{"name": "inbox overload", "detail": "too many unread messages",
                "cause": "mail arrives faster than it is triaged", "impact": "important mail is missed"}"#,
        )
        .respond(
            OutputSchema::Solutions,
            r#"[{"name": "Priority triage", "description": "score and label important mail",
                 "category": "prioritization", "required_tools": ["email_reader", "priority_scorer", "label_applier"],
                 "complexity": "low"},
                {"name": "Topic folders", "description": "classify mail by topic",
                 "category": "classification", "required_tools": ["classify"]},
                {"name": "Daily digest", "description": "remind me of unread mail",
                 "category": "reminder", "required_tools": ["notify"]}]"#,
        )
        .respond(OutputSchema::AgentParameters, r#"{"threshold": 0.5, "label": "important"}"#)
}

// ==================== Logger ====================

/// Keeps every logged event in memory.
#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<(&'static str, Value)>>,
}

impl RecordingLogger {
    /// Payloads of the events of `event_type`, in logging order.
    pub fn payloads(&self, event_type: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl InferenceLogger for RecordingLogger {
    fn log(&self, event: InferenceEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}

// ==================== Stores ====================

#[derive(Default)]
pub struct MemoryWorldModelStore {
    pub model: Mutex<WorldModel>,
    pub saves: Mutex<usize>,
    pub fail_saves: bool,
}

impl MemoryWorldModelStore {
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> WorldModel {
        self.model.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl WorldModelStore for MemoryWorldModelStore {
    async fn load(&self) -> Result<WorldModel, StoreError> {
        Ok(self.model.lock().unwrap().clone())
    }

    async fn save(&self, model: &WorldModel) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io("disk full".to_string()));
        }
        *self.model.lock().unwrap() = model.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCheckpointStore {
    runs: Mutex<Vec<PipelineRun>>,
}

impl MemoryCheckpointStore {
    /// Every state saved, in order.
    pub fn states(&self) -> Vec<String> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.state().as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, run: &PipelineRun) -> Result<(), StoreError> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn load(&self, id: &RunId) -> Result<PipelineRun, StoreError> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn latest(&self) -> Result<Option<PipelineRun>, StoreError> {
        Ok(self.runs.lock().unwrap().last().cloned())
    }
}

pub struct StaticSource(pub Result<Vec<SensedItem>, StoreError>);

#[async_trait]
impl SensedDataSource for StaticSource {
    async fn load_items(&self) -> Result<Vec<SensedItem>, StoreError> {
        self.0.clone()
    }
}

/// `count` unread mails; every other one flagged.
pub fn unread_items(count: usize) -> Vec<SensedItem> {
    (1..=count)
        .map(|i| {
            SensedItem::new(
                format!("m{}", i),
                serde_json::json!({
                    "subject": format!("mail {}", i),
                    "read": false,
                    "flagged": i % 2 == 0,
                }),
            )
        })
        .collect()
}

// ==================== Tools ====================

/// Scores flagged items 0.9 and others 0.2; fails on items listed in `failing`.
pub struct FakeTools {
    catalog: ToolCatalog,
    pub failing: Vec<String>,
    pub calls: Mutex<Vec<ToolCall>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::with_catalog(ToolCatalog::builtin())
    }

    pub fn with_catalog(catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, item: &str) -> Self {
        self.failing.push(item.to_string());
        self
    }
}

#[async_trait]
impl ToolExecutorPort for FakeTools {
    fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    async fn invoke(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing.contains(&call.item.id) {
            return Err(ToolError::Failed(format!("{} broke", call.tool)));
        }
        match call.tool.as_str() {
            builtin::SCORE_PRIORITY => Ok(ToolOutput::score(
                if call.item.bool_field("flagged") == Some(true) {
                    0.9
                } else {
                    0.2
                },
            )),
            builtin::CLASSIFY => Ok(ToolOutput::label(
                call.arg_str("label").unwrap_or("important"),
            )),
            builtin::APPLY_LABEL => Ok(ToolOutput::effect(format!(
                "label:{}",
                call.arg_str("label").unwrap_or_default()
            ))),
            builtin::NOTIFY => Ok(ToolOutput::effect(format!(
                "notify:{}",
                call.arg_str("channel").unwrap_or_default()
            ))),
            _ => Ok(ToolOutput::fields(call.item.fields())),
        }
    }
}

// ==================== Checkpoint ====================

/// Replays scripted decisions and records what it was shown.
pub struct RecordingCheckpoint {
    decisions: Mutex<VecDeque<ApprovalDecision>>,
    feedback: Mutex<Option<FeedbackMap>>,
    pub reviewed: Mutex<Vec<(SolutionSet, Option<Notice>)>>,
    pub paused: Mutex<Vec<PipelineFailure>>,
}

impl RecordingCheckpoint {
    pub fn new(decisions: Vec<ApprovalDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            feedback: Mutex::new(None),
            reviewed: Mutex::new(Vec::new()),
            paused: Mutex::new(Vec::new()),
        }
    }

    pub fn with_feedback(self, feedback: FeedbackMap) -> Self {
        *self.feedback.lock().unwrap() = Some(feedback);
        self
    }

    pub fn review_count(&self) -> usize {
        self.reviewed.lock().unwrap().len()
    }
}

#[async_trait]
impl HumanCheckpointPort for RecordingCheckpoint {
    async fn review_solutions(
        &self,
        _problem: &Problem,
        solutions: &SolutionSet,
        notice: Option<&Notice>,
    ) -> Result<ApprovalDecision, CheckpointError> {
        self.reviewed
            .lock()
            .unwrap()
            .push((solutions.clone(), notice.cloned()));
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CheckpointError::Cancelled)
    }

    async fn collect_feedback(
        &self,
        result: &ExecutionResult,
    ) -> Result<FeedbackMap, CheckpointError> {
        if let Some(feedback) = self.feedback.lock().unwrap().clone() {
            return Ok(feedback);
        }
        let mut map = FeedbackMap::new();
        for outcome in &result.per_item {
            map.insert(outcome.item_ref.clone(), Feedback::Confirmed);
        }
        Ok(map)
    }

    fn on_paused(&self, failure: &PipelineFailure) {
        self.paused.lock().unwrap().push(failure.clone());
    }
}

//! Context snapshot stage.
//!
//! Reads the sensed items and freezes them, together with the clock and the
//! profile facts, into an immutable [`ContextSnapshot`]. Makes no inference
//! call.

use super::shared::StageError;
use crate::ports::clock::Clock;
use crate::ports::sensed_data::SensedDataSource;
use gapwise_domain::{ContextSnapshot, SensedItem, WorldModel};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BuildSnapshotUseCase {
    source: Arc<dyn SensedDataSource>,
    clock: Arc<dyn Clock>,
}

impl BuildSnapshotUseCase {
    pub fn new(source: Arc<dyn SensedDataSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Builds the snapshot, failing with `DataUnavailable` on an empty or
    /// unreadable source.
    pub async fn build(&self, model: &WorldModel) -> Result<ContextSnapshot, StageError> {
        let items = self
            .source
            .load_items()
            .await
            .map_err(|e| StageError::DataUnavailable(e.to_string()))?;
        if items.is_empty() {
            return Err(StageError::DataUnavailable(
                "source yielded no items".to_string(),
            ));
        }
        Ok(self.freeze(items, model))
    }

    /// Like [`Self::build`], but absorbs `DataUnavailable` into an empty
    /// snapshot flagged as such.
    pub async fn execute(&self, model: &WorldModel) -> ContextSnapshot {
        match self.build(model).await {
            Ok(snapshot) => {
                info!("Snapshot built with {} items", snapshot.items().len());
                snapshot
            }
            Err(e) => {
                warn!("{}; continuing with an empty snapshot", e);
                self.freeze(Vec::new(), model).mark_data_unavailable()
            }
        }
    }

    fn freeze(&self, items: Vec<SensedItem>, model: &WorldModel) -> ContextSnapshot {
        ContextSnapshot::new(items, self.clock.now()).with_facts(profile_facts(model))
    }
}

/// Facts from the world model that every stage may consult.
fn profile_facts(model: &WorldModel) -> Map<String, Value> {
    let mut facts = Map::new();
    if !model.profile.name.is_empty() {
        facts.insert("user".to_string(), json!(model.profile.name));
    }
    if !model.profile.role.is_empty() {
        facts.insert("role".to_string(), json!(model.profile.role));
    }
    let goals: Vec<&str> = model
        .goals_by_priority()
        .into_iter()
        .map(|g| g.text.as_str())
        .collect();
    if !goals.is_empty() {
        facts.insert("goals".to_string(), json!(goals));
    }
    facts
}

//! World model stored as one pretty-printed JSON file.

use super::atomic::write_with_retry;
use super::io_error;
use async_trait::async_trait;
use gapwise_application::{StoreError, WorldModelStore};
use gapwise_domain::WorldModel;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const SAVE_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

pub struct JsonWorldModelStore {
    path: PathBuf,
    backoff: Duration,
}

impl JsonWorldModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backoff: INITIAL_BACKOFF,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl WorldModelStore for JsonWorldModelStore {
    /// A missing file is an empty model; a corrupt one is an error.
    async fn load(&self) -> Result<WorldModel, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No world model at {}, starting empty",
                    self.path.display()
                );
                return Ok(WorldModel::default());
            }
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let model: WorldModel = serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;
        debug!(
            "Loaded world model: {} goals, {} ideal states, {} patterns",
            model.goals().len(),
            model.ideal_states().len(),
            model.patterns().len()
        );
        Ok(model)
    }

    async fn save(&self, model: &WorldModel) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(model)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_with_retry(&self.path, &bytes, SAVE_ATTEMPTS, self.backoff).await?;
        debug!("Saved world model to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapwise_domain::{IdealState, Profile};

    #[tokio::test]
    async fn test_missing_file_is_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonWorldModelStore::new(dir.path().join("world.json"));
        assert_eq!(store.load().await.unwrap(), WorldModel::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonWorldModelStore::new(dir.path().join("world.json"));
        let mut model = WorldModel::new(Profile::new("Ada", "engineer"));
        model.upsert_ideal_state(IdealState::new("inbox", "unread_count", 5.0));

        store.save(&model).await.unwrap();
        assert_eq!(store.load().await.unwrap(), model);
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonWorldModelStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let store = JsonWorldModelStore::new(&path).with_backoff(Duration::from_millis(1));
        let model = WorldModel::new(Profile::new("Ada", "engineer"));
        store.save(&model).await.unwrap();

        // Pre-create the temp file name as a directory so the write fails
        let tmp = dir
            .path()
            .join(format!("world.json.{}.tmp", std::process::id()));
        std::fs::create_dir_all(tmp.join("blocker")).unwrap();

        let changed = WorldModel::new(Profile::new("Grace", "admiral"));
        assert!(store.save(&changed).await.is_err());
        assert_eq!(store.load().await.unwrap(), model);
    }
}

//! One JSON file per pipeline run.

use super::atomic::write_atomic;
use super::io_error;
use async_trait::async_trait;
use gapwise_application::{CheckpointStore, StoreError};
use gapwise_domain::{PipelineRun, RunId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Stores runs as `<dir>/<run-id>.json`.
pub struct JsonCheckpointStore {
    dir: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &RunId) -> PathBuf {
        // Ids are uuids; anything path-like is flattened
        let name: String = id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    async fn read(path: &Path) -> Result<PipelineRun, StoreError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| io_error(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn save(&self, run: &PipelineRun) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(run).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let path = self.path_for(&run.id);
        write_atomic(&path, &bytes).await?;
        debug!("Checkpointed run {} in {}", run.id, run.state());
        Ok(())
    }

    async fn load(&self, id: &RunId) -> Result<PipelineRun, StoreError> {
        Self::read(&self.path_for(id)).await
    }

    /// Scans the directory; unreadable files are skipped with a warning.
    async fn latest(&self) -> Result<Option<PipelineRun>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.dir, e)),
        };

        let mut latest: Option<PipelineRun> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path).await {
                Ok(run) => {
                    if latest
                        .as_ref()
                        .is_none_or(|current| run.updated_at > current.updated_at)
                    {
                        latest = Some(run);
                    }
                }
                Err(e) => warn!("Skipping unreadable run file: {}", e),
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gapwise_domain::PipelineState;

    #[tokio::test]
    async fn test_save_load_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("runs"));
        assert!(store.latest().await.unwrap().is_none());

        let now = Utc::now();
        let older = PipelineRun::new(now);
        let mut newer = PipelineRun::new(now);
        newer
            .transition(PipelineState::SnapshotReady, now + Duration::seconds(5))
            .unwrap();

        store.save(&newer).await.unwrap();
        store.save(&older).await.unwrap();
        std::fs::write(dir.path().join("runs/garbage.json"), "{").unwrap();

        let loaded = store.load(&newer.id).await.unwrap();
        assert_eq!(*loaded.state(), PipelineState::SnapshotReady);

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        assert!(matches!(
            store.load(&RunId::new("missing")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_ids_cannot_escape_dir() {
        let store = JsonCheckpointStore::new("/runs");
        let path = store.path_for(&RunId::new("../../etc/passwd"));
        assert_eq!(path, PathBuf::from("/runs/______etc_passwd.json"));
    }
}

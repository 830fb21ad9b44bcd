//! Storage and logging locations from TOML (`[storage]`, `[logging]`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration; unset paths resolve under the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    pub world_model: Option<String>,
    pub sensed_items: Option<String>,
    pub checkpoint_dir: Option<String>,
}

impl FileStorageConfig {
    /// `$XDG_DATA_HOME/gapwise`, or `./.gapwise` when there is no data dir.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("gapwise"))
            .unwrap_or_else(|| PathBuf::from(".gapwise"))
    }

    pub fn world_model_path(&self) -> PathBuf {
        resolve(self.world_model.as_deref(), "world_model.json")
    }

    pub fn sensed_items_path(&self) -> PathBuf {
        resolve(self.sensed_items.as_deref(), "inbox.json")
    }

    pub fn checkpoint_dir_path(&self) -> PathBuf {
        resolve(self.checkpoint_dir.as_deref(), "runs")
    }
}

fn resolve(configured: Option<&str>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) => expand_home(path),
        None => FileStorageConfig::data_dir().join(default_name),
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for JSONL inference transcripts; unset disables them
    pub inference_log: Option<String>,
    /// Directory for the daily rolling log file; unset logs to stderr only
    pub dir: Option<String>,
}

impl FileLoggingConfig {
    pub fn inference_log_dir(&self) -> Option<PathBuf> {
        self.inference_log.as_deref().map(expand_home)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(expand_home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_paths_use_data_dir() {
        let storage = FileStorageConfig::default();
        let base = FileStorageConfig::data_dir();
        assert_eq!(storage.world_model_path(), base.join("world_model.json"));
        assert_eq!(storage.checkpoint_dir_path(), base.join("runs"));
    }

    #[test]
    fn test_home_expansion() {
        let storage = FileStorageConfig {
            sensed_items: Some("~/mail/inbox.json".to_string()),
            ..FileStorageConfig::default()
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(storage.sensed_items_path(), home.join("mail/inbox.json"));
        }
    }
}

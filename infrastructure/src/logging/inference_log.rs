//! JSONL file writer for inference events.
//!
//! Each [`InferenceEvent`] becomes one JSON line carrying `type` and
//! `timestamp` next to the event payload.

use chrono::{SecondsFormat, Utc};
use gapwise_application::ports::inference_logger::{InferenceEvent, InferenceLogger};
use serde_json::{Map, Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Appends inference requests and responses to a JSONL transcript.
pub struct JsonlInferenceLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlInferenceLogger {
    /// Opens `path` for appending, creating parent directories.
    ///
    /// Returns `None` (after a warning) when the file cannot be opened; runs
    /// then continue without a transcript.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create inference log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open inference log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// One transcript file per process start inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Option<Self> {
        let name = format!("inference-{}.jsonl", Utc::now().format("%Y%m%dT%H%M%S"));
        Self::open(dir.as_ref().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: InferenceEvent) -> Value {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        match event.payload {
            Value::Object(payload) => {
                let mut map = Map::with_capacity(payload.len() + 2);
                map.insert("type".to_string(), Value::from(event.event_type));
                map.insert("timestamp".to_string(), Value::from(timestamp));
                map.extend(payload);
                Value::Object(map)
            }
            other => json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl InferenceLogger for JsonlInferenceLogger {
    fn log(&self, event: InferenceEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(event)) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            // Append-only: flush per line so a crash keeps the transcript
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlInferenceLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_become_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run.jsonl");
        let logger = JsonlInferenceLogger::open(&path).unwrap();

        logger.log(InferenceEvent::new(
            "inference_request",
            json!({"schema": "gaps", "strict": false}),
        ));
        logger.log(InferenceEvent::new(
            "inference_response",
            json!({"schema": "gaps", "text": "[]"}),
        ));
        drop(logger);

        let records = lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "inference_request");
        assert_eq!(records[0]["schema"], "gaps");
        assert!(records[0]["timestamp"].is_string());
        assert_eq!(records[1]["text"], "[]");
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let logger = JsonlInferenceLogger::open(&path).unwrap();
        logger.log(InferenceEvent::new("inference_error", json!("timed out")));
        drop(logger);

        let records = lines(&path);
        assert_eq!(records[0]["type"], "inference_error");
        assert_eq!(records[0]["data"], "timed out");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        for _ in 0..2 {
            let logger = JsonlInferenceLogger::open(&path).unwrap();
            logger.log(InferenceEvent::new("inference_request", json!({})));
        }
        assert_eq!(lines(&path).len(), 2);
    }
}

//! Sensed items read from a JSON file (an exported inbox, a task list...).

use super::io_error;
use async_trait::async_trait;
use gapwise_application::{SensedDataSource, StoreError};
use gapwise_domain::SensedItem;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Reads either a top-level array of objects or `{"items": [...]}`.
///
/// Every object must carry an `id` (string or number); the whole object
/// becomes the item payload. Objects without an id are skipped.
pub struct JsonSensedItems {
    path: PathBuf,
}

impl JsonSensedItems {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn parse_items(value: Value) -> Result<Vec<SensedItem>, StoreError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(StoreError::Corrupt(
                    "expected an array of items or an object with an \"items\" array".to_string(),
                ));
            }
        },
        _ => {
            return Err(StoreError::Corrupt(
                "expected an array of items".to_string(),
            ));
        }
    };

    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let id = match entry.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                warn!("Skipping sensed item #{} without an id", index);
                continue;
            }
        };
        items.push(SensedItem::new(id, entry));
    }
    Ok(items)
}

#[async_trait]
impl SensedDataSource for JsonSensedItems {
    async fn load_items(&self) -> Result<Vec<SensedItem>, StoreError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;
        let items = parse_items(value)?;
        debug!("Loaded {} sensed items from {}", items.len(), self.path.display());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_and_wrapped_forms() {
        let items = parse_items(json!([
            {"id": "m1", "read": false},
            {"id": 2, "read": true},
            {"subject": "no id"}
        ]))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "m1");
        assert_eq!(items[0].bool_field("read"), Some(false));
        assert_eq!(items[1].id, "2");

        let wrapped = parse_items(json!({"items": [{"id": "a"}]})).unwrap();
        assert_eq!(wrapped.len(), 1);

        assert!(parse_items(json!("nope")).is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonSensedItems::new(dir.path().join("inbox.json"));
        assert!(matches!(
            source.load_items().await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox.json");
        std::fs::write(&path, r#"[{"id": "m1", "flagged": true}]"#).unwrap();
        let items = JsonSensedItems::new(&path).load_items().await.unwrap();
        assert_eq!(items[0].bool_field("flagged"), Some(true));
    }
}

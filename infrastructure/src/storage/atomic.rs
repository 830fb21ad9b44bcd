//! All-or-nothing file writes.

use super::io_error;
use gapwise_application::StoreError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::warn;

/// Writes `bytes` to a sibling temp file and renames it over `path`.
///
/// Readers observe either the old or the new content, never a torn file.
pub(super) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_error(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_error(path, e));
    }
    Ok(())
}

/// [`write_atomic`] with `attempts` tries and doubling backoff.
pub(super) async fn write_with_retry(
    path: &Path,
    bytes: &[u8],
    attempts: u32,
    initial_backoff: Duration,
) -> Result<(), StoreError> {
    let mut backoff = initial_backoff;
    let mut attempt = 1;
    loop {
        match write_atomic(path, bytes).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                warn!(
                    "Write to {} failed (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    attempts,
                    e
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/model.json");

        write_atomic(&path, b"one").await.unwrap();
        write_atomic(&path, b"two").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go makes every rename fail
        let path = dir.path().join("model.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let result = write_with_retry(&path, b"x", 3, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}

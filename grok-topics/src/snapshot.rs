//! On-disk snapshot of the merged tree
//!
//! A JSON file `{ "data": TopicTree, "timestamp": epoch_ms }` reused across runs while
//! `now - timestamp < ttl` (one hour by default). A missing, unreadable or corrupt file
//! reads as absent.

use grok_common::{time, TopicTree};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

/// Snapshot validity window
pub const SNAPSHOT_TTL_MS: i64 = 3_600_000;

#[derive(Debug, Deserialize)]
struct Snapshot {
    data: TopicTree,
    timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh snapshot contents, if any
    pub async fn load(&self) -> Option<TopicTree> {
        self.load_at(time::now_millis()).await
    }

    /// Snapshot contents if fresh at `now_ms`
    pub async fn load_at(&self, now_ms: i64) -> Option<TopicTree> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Snapshot unreadable");
                return None;
            }
        };

        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Snapshot corrupt, ignoring");
                return None;
            }
        };

        if time::is_fresh(snapshot.timestamp, SNAPSHOT_TTL_MS, now_ms) {
            debug!(
                path = %self.path.display(),
                age_ms = now_ms - snapshot.timestamp,
                "Using snapshot"
            );
            Some(snapshot.data)
        } else {
            debug!(path = %self.path.display(), "Snapshot expired");
            None
        }
    }

    /// Write `data` stamped with the current time
    pub async fn save(&self, data: &TopicTree) -> Result<()> {
        self.save_at(data, time::now_millis()).await
    }

    pub async fn save_at(&self, data: &TopicTree, timestamp: i64) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            data: &'a TopicTree,
            timestamp: i64,
        }
        let bytes = serde_json::to_vec(&SnapshotRef { data, timestamp })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), topics = data.len(), "Snapshot written");
        Ok(())
    }

    /// Delete the snapshot; absent is fine
    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grok_common::config::SNAPSHOT_KEY;
    use grok_common::TopicItem;
    use tempfile::TempDir;

    fn sample() -> TopicTree {
        let mut tree = TopicTree::new();
        tree.insert("ml".into(), TopicItem::new("Machine Learning").with_content("x"));
        tree
    }

    fn store(dir: &TempDir) -> SnapshotStore {
        SnapshotStore::new(dir.path().join(format!("{}.json", SNAPSHOT_KEY)))
    }

    #[tokio::test]
    async fn test_fresh_snapshot_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = 1_700_000_000_000;

        store.save_at(&sample(), now).await.unwrap();
        assert_eq!(store.load_at(now + SNAPSHOT_TTL_MS - 1).await, Some(sample()));
    }

    #[tokio::test]
    async fn test_snapshot_expires_at_one_hour() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now = 1_700_000_000_000;

        store.save_at(&sample(), now).await.unwrap();
        assert_eq!(store.load_at(now + SNAPSHOT_TTL_MS).await, None);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_read_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.load().await, None);

        std::fs::write(store.path(), b"{not json").unwrap();
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&sample()).await.unwrap();
        assert!(store.load().await.is_some());

        store.remove().await.unwrap();
        store.remove().await.unwrap();
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_file_shape() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save_at(&sample(), 42).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["timestamp"], 42);
        assert_eq!(raw["data"]["ml"]["label"], "Machine Learning");
    }
}

//! Topic data provider
//!
//! Holds the tree a front end renders, with loading and error state. On mount a fresh
//! snapshot is used as-is; otherwise the tree is fetched through the service. Only one
//! fetch runs at a time per provider: overlapping calls return immediately.

use grok_common::TopicTree;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info};

use crate::service::TopicDataService;

/// Message shown when a fetch fails and the previous data is kept
pub const LOAD_ERROR: &str = "Failed to load topic data. Using default data instead.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderState {
    pub topic_data: TopicTree,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct TopicDataProvider {
    service: Arc<TopicDataService>,
    initial_empty: bool,
    state: RwLock<ProviderState>,
    fetching: AtomicBool,
}

/// Clears the in-flight flag when the fetch ends, however it ends
struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TopicDataProvider {
    pub fn new(service: Arc<TopicDataService>, initial: TopicTree) -> Self {
        Self {
            service,
            initial_empty: initial.is_empty(),
            state: RwLock::new(ProviderState {
                topic_data: initial,
                is_loading: true,
                error: None,
            }),
            fetching: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> ProviderState {
        self.read().clone()
    }

    pub fn topic_data(&self) -> TopicTree {
        self.read().topic_data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Initial load: fresh snapshot, else initial data, else a fetch
    pub async fn mount(&self) {
        if let Some(snapshot) = self.service.snapshot() {
            if let Some(data) = snapshot.load().await {
                info!(topics = data.len(), "Topic data restored from snapshot");
                let mut state = self.write();
                state.topic_data = data;
                state.is_loading = false;
                return;
            }
        }

        if self.initial_empty {
            self.fetch().await;
        } else {
            self.write().is_loading = false;
        }
    }

    /// Fetch through the service; `false` when another fetch was already running
    pub async fn fetch(&self) -> bool {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Topic data fetch already in flight, skipping");
            return false;
        }
        let _guard = FetchGuard(&self.fetching);

        self.write().is_loading = true;
        let result = self.service.try_get_all_topic_data().await;

        let mut state = self.write();
        match result {
            Ok(data) => {
                state.topic_data = data;
                state.error = None;
            }
            Err(e) => {
                error!(error = %e, "Error loading topic data");
                state.error = Some(LOAD_ERROR.to_string());
            }
        }
        state.is_loading = false;
        true
    }

    /// Drop the service caches, then fetch
    pub async fn refetch(&self) -> bool {
        self.service.clear_cache();
        self.fetch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::DataAccessor;
    use crate::markdown::LocalMarkdownSource;
    use crate::resolve::AliasTable;
    use crate::snapshot::SnapshotStore;
    use crate::store::SqlStore;
    use grok_common::{time, TopicItem};
    use grok_common::db::init_memory_database;
    use std::time::Duration;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn setup(dir: &TempDir) -> (Arc<TopicDataService>, SnapshotStore) {
        std::fs::write(dir.path().join("ml.md"), "# Machine Learning\n## Basics\n").unwrap();
        let pool = init_memory_database().await.unwrap();
        let accessor = Arc::new(DataAccessor::new(Arc::new(SqlStore::new(pool)), HOUR));
        let snapshot = SnapshotStore::new(dir.path().join("snapshot.json"));
        let service = TopicDataService::new(
            accessor,
            Arc::new(LocalMarkdownSource::new(dir.path())),
            AliasTable::builtin(),
            HOUR,
        )
        .with_snapshot(snapshot.clone());
        (Arc::new(service), snapshot)
    }

    fn cached_tree() -> TopicTree {
        TopicTree::from([("cached".to_string(), TopicItem::new("From snapshot"))])
    }

    #[tokio::test]
    async fn test_mount_uses_fresh_snapshot() {
        let dir = TempDir::new().unwrap();
        let (service, snapshot) = setup(&dir).await;
        snapshot.save(&cached_tree()).await.unwrap();

        let provider = TopicDataProvider::new(service, TopicTree::new());
        assert!(provider.is_loading());
        provider.mount().await;

        assert_eq!(provider.topic_data(), cached_tree());
        assert!(!provider.is_loading());
    }

    #[tokio::test]
    async fn test_mount_refetches_after_snapshot_expiry() {
        let dir = TempDir::new().unwrap();
        let (service, snapshot) = setup(&dir).await;
        let two_hours_ago = time::now_millis() - 2 * 3_600_000;
        snapshot.save_at(&cached_tree(), two_hours_ago).await.unwrap();

        let provider = TopicDataProvider::new(service, TopicTree::new());
        provider.mount().await;

        let data = provider.topic_data();
        assert!(data.contains_key("ml"));
        assert!(!data.contains_key("cached"));
        // The fresh tree replaced the expired snapshot
        assert_eq!(snapshot.load().await, Some(data));
    }

    #[tokio::test]
    async fn test_overlapping_fetch_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (service, _) = setup(&dir).await;
        let provider = TopicDataProvider::new(service, TopicTree::new());

        let (first, second) = tokio::join!(provider.fetch(), provider.fetch());
        assert!(first);
        assert!(!second);
        assert!(!provider.is_loading());
        assert!(provider.fetch().await, "guard released after completion");
    }

    #[tokio::test]
    async fn test_initial_data_skips_fetch() {
        let dir = TempDir::new().unwrap();
        let (service, _) = setup(&dir).await;
        let provider = TopicDataProvider::new(service, cached_tree());
        provider.mount().await;
        assert_eq!(provider.state().topic_data, cached_tree());
        assert_eq!(provider.error(), None);
    }

    #[tokio::test]
    async fn test_refetch_sees_new_content() {
        let dir = TempDir::new().unwrap();
        let (service, _) = setup(&dir).await;
        let provider = TopicDataProvider::new(service, TopicTree::new());
        provider.mount().await;
        assert!(!provider.topic_data().contains_key("dsa"));

        std::fs::write(dir.path().join("dsa.md"), "# Data Structures\n").unwrap();
        provider.fetch().await;
        assert!(!provider.topic_data().contains_key("dsa"), "served from cache");

        provider.refetch().await;
        assert!(provider.topic_data().contains_key("dsa"));
    }
}

//! Time-expiring memoization with request coalescing
//!
//! Every cache tier of the accessor and the reconciliation service is a [`TtlCache`].
//! An entry is valid while `now - fetched_at < ttl`. Entries are populated lazily by
//! [`TtlCache::get_or_fetch`], never partially invalidated except by expiry, and dropped
//! wholesale by [`TtlCache::clear`].
//!
//! Concurrent misses on the same key are coalesced: the first caller fetches while the
//! others wait on a per-key lock and then read the freshly cached value. Failed fetches are
//! never cached. A fetch that started before a `clear()` still returns its value to its
//! caller but does not repopulate the cache.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    locks: HashMap<K, Arc<tokio::sync::Mutex<()>>>,
    generation: u64,
}

/// Keyed cache with a fixed time-to-live
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Create an empty cache; `name` tags log output
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                locks: HashMap::new(),
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // A panic while holding the guard cannot leave the maps half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh value for `key`, if any. Stale entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let stale = match inner.entries.get(key) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if stale {
            inner.entries.remove(key);
        }
        None
    }

    /// Store a value stamped with the current instant
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.lock();
        inner.entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.generation += 1;
        debug!(cache = self.name, "Cache cleared");
    }

    /// Number of stored entries (fresh or not yet evicted)
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value or run `fetch` and cache its success
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            debug!(cache = self.name, key = ?key, "Cache hit");
            return Ok(value);
        }

        let key_lock = {
            let mut inner = self.lock();
            inner
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let result = {
            let _in_flight = key_lock.lock().await;

            // Another caller may have filled the entry while we waited
            if let Some(value) = self.get(&key) {
                debug!(cache = self.name, key = ?key, "Cache filled by concurrent fetch");
                Ok(value)
            } else {
                let generation = self.lock().generation;
                debug!(cache = self.name, key = ?key, "Cache miss, fetching");

                match fetch().await {
                    Ok(value) => {
                        let mut inner = self.lock();
                        if inner.generation == generation {
                            inner.entries.insert(
                                key.clone(),
                                Entry {
                                    value: value.clone(),
                                    fetched_at: Instant::now(),
                                },
                            );
                        } else {
                            debug!(
                                cache = self.name,
                                key = ?key,
                                "Cache cleared during fetch, result not stored"
                            );
                        }
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        };

        // Drop the per-key lock once nobody else holds or waits on it
        let mut inner = self.lock();
        if Arc::strong_count(&key_lock) <= 2 {
            inner.locks.remove(&key);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_get_or_fetch_caches_success() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", HOUR);
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        for _ in 0..3 {
            let value: Result<u32, ()> = cache
                .get_or_fetch("k".to_string(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache: TtlCache<&'static str, u32> = TtlCache::new("test", HOUR);
        let first: Result<u32, &str> = cache.get_or_fetch("k", || async { Err("down") }).await;
        assert_eq!(first, Err("down"));
        assert!(cache.is_empty());

        let second: Result<u32, &str> = cache.get_or_fetch("k", || async { Ok(1) }).await;
        assert_eq!(second, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache: TtlCache<u8, u32> = TtlCache::new("test", HOUR);
        cache.insert(1, 10);

        tokio::time::advance(HOUR - Duration::from_secs(1)).await;
        assert_eq!(cache.get(&1), Some(10));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty(), "stale entry should be evicted on read");
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let cache: TtlCache<u8, u32> = TtlCache::new("test", HOUR);
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let fetch = move || async move {
            Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) as u32)
        };

        assert_eq!(cache.get_or_fetch(1, fetch).await, Ok(0));
        cache.clear();
        assert_eq!(cache.get_or_fetch(1, fetch).await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_are_coalesced() {
        let cache: Arc<TtlCache<String, u32>> = Arc::new(TtlCache::new("test", HOUR));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("ml".to_string(), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ()>(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.lock().locks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_fetch_does_not_repopulate() {
        let cache: Arc<TtlCache<u8, u32>> = Arc::new(TtlCache::new("test", HOUR));

        let in_flight = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(1, || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, ()>(99)
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.clear();

        assert_eq!(in_flight.await.unwrap(), Ok(99));
        assert_eq!(cache.get(&1), None);
    }
}

//! In-process TTL cache.
//!
//! Expired entries count as absent and are evicted when touched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A string-keyed cache where every entry carries its own time-to-live.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, Entry<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        None
    }

    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Get and remove.
    pub fn pull(&self, key: &str) -> Option<V> {
        let (_, entry) = self.entries.remove(key)?;
        (entry.expires_at > Instant::now()).then_some(entry.value)
    }

    pub fn forget(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Return the cached value, or run `producer` and cache its result.
    ///
    /// Errors from `producer` are returned as-is and nothing is cached.
    pub async fn remember<F, Fut, E>(&self, key: &str, ttl: Duration, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = producer().await?;
        self.put(key, value.clone(), ttl);
        Ok(value)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new();
        cache.put("book:1", 7, Duration::from_secs(300));

        assert_eq!(cache.get("book:1"), Some(7));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.contains("book:1"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("book:1"), None);
        assert!(cache.is_empty(), "expired entry is evicted on access");
    }

    #[tokio::test]
    async fn pull_removes_entry() {
        let cache = TtlCache::new();
        cache.put("k", "v".to_string(), Duration::from_secs(60));

        assert_eq!(cache.pull("k").as_deref(), Some("v"));
        assert_eq!(cache.pull("k"), None);
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_of_expired_entry_is_none() {
        let cache = TtlCache::new();
        cache.put("k", 1, Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.pull("k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn forget_reports_presence() {
        let cache = TtlCache::new();
        cache.put("k", 1, Duration::from_secs(60));

        assert!(cache.forget("k"));
        assert!(!cache.forget("k"));
    }

    #[tokio::test]
    async fn remember_runs_producer_once() {
        let cache: TtlCache<Option<u32>> = TtlCache::new();
        let mut calls = 0;

        let first: Result<_, ()> = cache
            .remember("books:id:1", Duration::from_secs(60), || {
                calls += 1;
                async { Ok(None) }
            })
            .await;
        assert_eq!(first, Ok(None));

        // A cached `None` is still a hit.
        let second: Result<_, ()> = cache
            .remember("books:id:1", Duration::from_secs(60), || {
                calls += 1;
                async { Ok(Some(5)) }
            })
            .await;
        assert_eq!(second, Ok(None));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn remember_does_not_cache_errors() {
        let cache: TtlCache<u32> = TtlCache::new();

        let failed = cache
            .remember("k", Duration::from_secs(60), || async { Err("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert!(cache.is_empty());

        let ok: Result<u32, &str> = cache
            .remember("k", Duration::from_secs(60), || async { Ok(3) })
            .await;
        assert_eq!(ok, Ok(3));
        assert_eq!(cache.get("k"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_keeps_live_entries() {
        let cache = TtlCache::new();
        cache.put("short", 1, Duration::from_secs(1));
        cache.put("long", 2, Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(5)).await;
        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let cache = TtlCache::new();
        let other = cache.clone();
        cache.put("k", 1, Duration::from_secs(60));
        assert_eq!(other.get("k"), Some(1));
    }
}

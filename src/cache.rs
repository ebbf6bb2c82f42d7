//! In-memory TTL cache for upstream results.
//!
//! Entries are checked for freshness on read and never swept; an expired
//! entry stays in the map until the next miss for its key replaces it.
//! Concurrent misses for one key are not coalesced, each caller fetches.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Build a cache key from an operation name and its normalized arguments.
pub fn cache_key<I, A>(operation: &str, args: I) -> String
where
    I: IntoIterator<Item = A>,
    A: Display,
{
    let mut key = operation.to_string();
    for arg in args {
        key.push('|');
        key.push_str(&arg.to_string());
    }
    key
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Returns the value if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if Instant::now() < entry.expires_at {
            tracing::debug!(key, "Key found and still fresh");
            Some(entry.value.clone())
        } else {
            tracing::debug!(key, "Key found but expired");
            None
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: &str, value: V) {
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// success. Failures are passed through and leave the cache untouched.
    pub async fn get_or_try_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = fetch().await?;
        self.put(key, value.clone());
        Ok(value)
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("geocode", ["paris"]), "geocode|paris");
        assert_eq!(
            cache_key(
                "places",
                [
                    "48.856600".to_string(),
                    "2.352200".to_string(),
                    "5000".to_string(),
                ],
            ),
            "places|48.856600|2.352200|5000"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_before_expiry() {
        let cache = TtlCache::new(Duration::from_secs(300));
        let counter = AtomicU32::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value: Result<u32, ()> = cache
                .get_or_try_fetch("k", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
            tokio::time::advance(Duration::from_secs(60)).await;
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_expiry() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.put("k", 1);
        assert_eq!(cache.get("k"), Some(1));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(cache.get("k"), None);
        // lazily evicted: the stale entry is still stored
        assert_eq!(cache.len(), 1);

        let value: Result<u32, ()> = cache.get_or_try_fetch("k", || async { Ok(2) }).await;
        assert_eq!(value, Ok(2));
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(300));

        let first: Result<u32, &str> = cache.get_or_try_fetch("k", || async { Err("down") }).await;
        assert_eq!(first, Err("down"));
        assert!(cache.is_empty());

        let second: Result<u32, &str> = cache.get_or_try_fetch("k", || async { Ok(5) }).await;
        assert_eq!(second, Ok(5));
    }
}

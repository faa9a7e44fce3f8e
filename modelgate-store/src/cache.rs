//! Time-bounded get-or-build cache.
//!
//! Every value held here must be re-derivable from the configuration source
//! of truth. Builds run outside the lock, so two callers racing on a cold
//! key may both build; the last writer wins and both results are equal.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::trace;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> Entry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

// ============================================================================
// TTL Cache
// ============================================================================

/// A keyed cache whose entries expire after a fixed time-to-live.
///
/// Use `()` as the key for a single cached value.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty cache. `name` only shows up in traces.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a fresh value, if any.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_fresh(self.ttl))
            .map(|e| e.value.clone())
    }

    /// Stores a value, replacing whatever was there.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Returns the fresh value for `key`, building and storing it on a miss.
    ///
    /// A failed build stores nothing.
    pub async fn get_or_try_build<F, Fut, E>(&self, key: K, build: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            trace!(cache = self.name, "Cache hit");
            return Ok(value);
        }

        trace!(cache = self.name, "Cache miss, building");
        let value = build().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Drops one entry.
    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        trace!(cache = self.name, dropped = entries.len(), "Cache cleared");
        entries.clear();
    }

    /// Returns the number of fresh entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.is_fresh(self.ttl)).count()
    }

    /// Returns true if no fresh entry exists.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_get_or_build_builds_once() {
        let cache: TtlCache<String, u32> = TtlCache::new("test", Duration::from_secs(60));
        let builds = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_build("k".to_string(), || async {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_hits() {
        let cache: TtlCache<(), u32> = TtlCache::new("test", Duration::ZERO);
        cache.insert((), 1).await;
        assert!(cache.get(&()).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_build_stores_nothing() {
        let cache: TtlCache<(), u32> = TtlCache::new("test", Duration::from_secs(60));
        let result = cache
            .get_or_try_build((), || async { Err::<u32, _>("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert!(cache.get(&()).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache: TtlCache<u8, u8> = TtlCache::new("test", Duration::from_secs(60));
        cache.insert(1, 10).await;
        cache.insert(2, 20).await;

        cache.invalidate(&1).await;
        assert!(cache.get(&1).await.is_none());
        assert_eq!(cache.get(&2).await, Some(20));

        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }
}

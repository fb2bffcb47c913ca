use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Process-local TTL cache.
///
/// Constructed once and injected into the component that owns it, so tests
/// can use isolated instances. Sweeps run item-at-a-time on the runtime, so
/// the mutex is only ever briefly contended; last write wins within TTL
/// bounds.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value if it is younger than the TTL.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop entries older than `max_age`. The periodic eviction sweep uses
    /// 2×TTL so recently-expired entries linger briefly rather than being
    /// collected the instant they go stale.
    pub async fn evict_older_than(&self, max_age: Duration) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| e.stored_at.elapsed() <= max_age);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_entry_is_returned() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), 1).await;
        assert_eq!(cache.get(&"a".into()).await, Some(1));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::ZERO);
        cache.insert("a".into(), 1).await;
        assert_eq!(cache.get(&"a".into()).await, None);
    }

    #[tokio::test]
    async fn eviction_removes_old_entries_only() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), 1).await;
        // Nothing is older than an hour yet.
        cache.evict_older_than(Duration::from_secs(3600)).await;
        assert_eq!(cache.len().await, 1);
        cache.evict_older_than(Duration::ZERO).await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn insert_overwrites() {
        let cache: TtlCache<String, i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), 1).await;
        cache.insert("a".into(), 2).await;
        assert_eq!(cache.get(&"a".into()).await, Some(2));
        assert_eq!(cache.len().await, 1);
    }
}

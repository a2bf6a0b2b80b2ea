//! Injectable time-boxed caching.
//!
//! The pipeline only sees the [`Cache`] trait; [`MemoryCache`] is the
//! in-process implementation and [`NoCache`] turns caching off.

use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default lifetime of cached statements (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 30);

pub trait Cache<V: Clone> {
    /// Returns the value for `key` if present and not expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` under the cache's default TTL.
    fn set(&self, key: &str, value: V) {
        self.set_with_ttl(key, value, self.ttl());
    }

    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration);

    fn ttl(&self) -> Duration;

    fn invalidate(&self, key: &str);

    fn clear(&self);
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V> MemoryCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Entries stored, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn purge_expired(&self) {
        let now = Instant::now();
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            debug!("Purged {} expired cache entries", before - entries.len());
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        // A zero TTL disables storage
        if ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value,
                    expires_at: Instant::now().checked_add(ttl),
                },
            );
        }
    }

    fn ttl(&self) -> Duration {
        self.default_ttl
    }

    fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// A cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<V: Clone> Cache<V> for NoCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn set_with_ttl(&self, _key: &str, _value: V, _ttl: Duration) {}

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }

    fn invalidate(&self, _key: &str) {}

    fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_basic_operations() {
        let cache: MemoryCache<String> = MemoryCache::default();
        assert_eq!(cache.ttl(), DEFAULT_TTL);

        assert!(cache.get("AAPL").is_none());

        cache.set("AAPL", "v1".to_string());
        assert_eq!(cache.get("AAPL"), Some("v1".to_string()));

        cache.set("AAPL", "v2".to_string());
        assert_eq!(cache.get("AAPL"), Some("v2".to_string()));

        cache.invalidate("AAPL");
        assert!(cache.get("AAPL").is_none());
    }

    #[test]
    fn test_expiration() {
        let cache: MemoryCache<i32> = MemoryCache::new(Duration::from_millis(50));
        cache.set("MSFT", 1);
        assert_eq!(cache.get("MSFT"), Some(1));

        sleep(Duration::from_millis(80));
        assert!(cache.get("MSFT").is_none());
        assert_eq!(cache.len(), 1);

        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_override() {
        let cache: MemoryCache<i32> = MemoryCache::new(Duration::from_secs(60));
        cache.set_with_ttl("TSLA", 1, Duration::from_millis(50));
        cache.set("NVDA", 2);

        sleep(Duration::from_millis(80));
        assert!(cache.get("TSLA").is_none());
        assert_eq!(cache.get("NVDA"), Some(2));
    }

    #[test]
    fn test_zero_ttl_disables() {
        let cache: MemoryCache<i32> = MemoryCache::new(Duration::ZERO);
        cache.set("AAPL", 1);
        assert!(cache.get("AAPL").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache: MemoryCache<i32> = MemoryCache::new(Duration::from_secs(u64::MAX));
        cache.set("AAPL", 1);
        cache.set_with_ttl("MSFT", 2, Duration::MAX);

        assert_eq!(cache.get("AAPL"), Some(1));
        assert_eq!(cache.get("MSFT"), Some(2));
        cache.purge_expired();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_clear() {
        let cache: MemoryCache<i32> = MemoryCache::default();
        cache.set("A", 1);
        cache.set("B", 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_no_cache() {
        let cache = NoCache;
        Cache::<i32>::set(&cache, "A", 1);
        assert_eq!(Cache::<i32>::get(&cache, "A"), None);
    }
}

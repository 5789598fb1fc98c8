//! In-process TTL cache tier
//!
//! Always written, whether or not the remote tier is configured, so every
//! process keeps at least a local copy. Expired entries read as misses and
//! are removed by [`MemoryCache::sweep_expired`].

use crate::clock::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    stored_at_millis: i64,
    ttl_millis: i64,
}

impl CacheEntry {
    fn is_expired(&self, now_millis: i64) -> bool {
        now_millis - self.stored_at_millis > self.ttl_millis
    }
}

/// Key -> serialized value map with per-entry TTL
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now_millis();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.data.clone())
    }

    pub fn set(&self, key: &str, value: String, ttl: Duration) {
        let entry = CacheEntry {
            data: value,
            stored_at_millis: self.clock.now_millis(),
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        };
        self.lock().insert(key.to_string(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (MemoryCache, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        (MemoryCache::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_set_then_get() {
        let (cache, _) = cache_with_clock();
        cache.set("k", "v".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_entry_alive_at_exact_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), Duration::from_secs(60));

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "v".to_string(), Duration::from_secs(u64::MAX));

        assert_eq!(cache.get("k"), Some("v".to_string()));
        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.sweep_expired(), 0);
    }

    #[test]
    fn test_expired_entry_stays_until_sweep() {
        let (cache, clock) = cache_with_clock();
        cache.set("old", "1".to_string(), Duration::from_secs(10));
        cache.set("fresh", "2".to_string(), Duration::from_secs(600));

        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some("2".to_string()));
    }

    #[test]
    fn test_overwrite_resets_timestamp() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", "a".to_string(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        cache.set("k", "b".to_string(), Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get("k"), Some("b".to_string()));
    }

    #[test]
    fn test_delete() {
        let (cache, _) = cache_with_clock();
        cache.set("k", "v".to_string(), Duration::from_secs(60));
        cache.delete("k");
        cache.delete("never-set");
        assert!(cache.is_empty());
    }
}

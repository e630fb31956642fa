//! In-process memory tier.
//!
//! Entries carry their own deadline and typed payload. Expired entries are
//! reported as absent but stay in place until overwritten, removed or
//! evicted by the LRU bound.

use std::any::Any;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct MemoryEntry {
    expire_at: Instant,
    value: Arc<dyn Any + Send + Sync>,
}

/// Key to typed-value map with absolute expiry per entry.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.memory_capacity_non_zero())),
        }
    }

    /// Returns a clone of the stored value when it is fresh and of type `T`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let entry = entries.get(key)?;
        if entry.expire_at <= now {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Replaces the entry for `key`; the deadline is computed at write time.
    pub fn insert<T>(&self, key: &str, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = MemoryEntry {
            expire_at: Instant::now() + ttl,
            value: Arc::new(value),
        };
        rw_write(&self.entries, SOURCE, "insert").put(key.to_string(), entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        rw_write(&self.entries, SOURCE, "remove").pop(key).is_some()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_are_returned() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.insert("posts-meta", vec![1_u32, 2, 3], Duration::from_secs(60));

        assert_eq!(store.get::<Vec<u32>>("posts-meta"), Some(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_absent_but_stay_stored() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.insert("posts-meta", "value".to_string(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(store.get::<String>("posts-meta"), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_resets_deadline() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.insert("k", 1_u8, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        store.insert("k", 2_u8, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get::<u8>("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn type_mismatch_reads_as_absent() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.insert("k", 7_u64, Duration::from_secs(10));

        assert_eq!(store.get::<String>("k"), None);
        assert_eq!(store.get::<u64>("k"), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn lru_bound_evicts_oldest() {
        let config = CacheConfig {
            memory_capacity: 2,
            ..Default::default()
        };
        let store = MemoryStore::new(&config);
        store.insert("a", 1_u8, Duration::from_secs(10));
        store.insert("b", 2_u8, Duration::from_secs(10));
        store.insert("c", 3_u8, Duration::from_secs(10));

        assert_eq!(store.get::<u8>("a"), None);
        assert_eq!(store.get::<u8>("b"), Some(2));
        assert_eq!(store.get::<u8>("c"), Some(3));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.insert("k", 1_u8, Duration::from_secs(10));

        assert!(store.remove("k"));
        assert!(!store.remove("k"));
        assert!(store.is_empty());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = MemoryStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.insert("k", 1_u8, Duration::from_secs(10));
        assert_eq!(store.get::<u8>("k"), Some(1));
    }
}

//! Local Cache - Mutex-Guarded LRU
//!
//! The per-group in-process tier. Every operation is a short, CPU-only
//! critical section; no I/O happens while the lock is held.

use std::sync::Arc;

use parking_lot::Mutex;

use super::byteview::ByteView;
use super::lru::LruCache;
use super::metrics::GroupMetrics;

/// Thread-safe byte-budgeted cache of [`ByteView`]s
#[derive(Debug)]
pub struct LocalCache {
    lru: Mutex<LruCache<ByteView>>,
}

/// Local cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalCacheStats {
    /// Live bytes (keys + values)
    pub used_bytes: i64,
    /// Budget in bytes (0 = unbounded)
    pub capacity_bytes: i64,
    /// Number of entries
    pub entries: usize,
}

impl LocalCache {
    /// Create a cache with a byte budget (0 = unbounded)
    pub fn new(capacity_bytes: i64) -> Self {
        Self {
            lru: Mutex::new(LruCache::new(capacity_bytes)),
        }
    }

    /// Create a cache that counts evictions into `metrics`
    pub fn with_metrics(capacity_bytes: i64, metrics: Arc<GroupMetrics>) -> Self {
        let on_evict = Box::new(move |_: &str, _: &ByteView| metrics.record_eviction());
        Self {
            lru: Mutex::new(LruCache::with_eviction_callback(capacity_bytes, on_evict)),
        }
    }

    /// Look up a key. The returned view shares the cached allocation.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.lru.lock().get(key).cloned()
    }

    /// Insert or replace a key
    pub fn add(&self, key: &str, value: ByteView) {
        self.lru.lock().add(key, value);
    }

    /// Check if the cache holds `key`
    pub fn contains(&self, key: &str) -> bool {
        self.lru.lock().contains(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.lru.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.lru.lock().is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> LocalCacheStats {
        let lru = self.lru.lock();
        LocalCacheStats {
            used_bytes: lru.used_bytes(),
            capacity_bytes: lru.capacity_bytes(),
            entries: lru.len(),
        }
    }
}

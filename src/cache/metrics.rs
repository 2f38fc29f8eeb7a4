//! Group Metrics Collection
//!
//! Lock-free counters describing how each group's lookups were served.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-group counters
#[derive(Debug, Default)]
pub struct GroupMetrics {
    gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,

    // Load path
    local_loads: AtomicU64,
    load_failures: AtomicU64,
    remote_hits: AtomicU64,
    remote_failures: AtomicU64,

    evictions: AtomicU64,
}

impl GroupMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load(&self) {
        self.local_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_hit(&self) {
        self.remote_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn local_loads(&self) -> u64 {
        self.local_loads.load(Ordering::Relaxed)
    }

    pub fn remote_hits(&self) -> u64 {
        self.remote_hits.load(Ordering::Relaxed)
    }

    pub fn remote_failures(&self) -> u64 {
        self.remote_failures.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Hit ratio over all non-empty-key lookups
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits(),
            misses: self.misses(),
            local_loads: self.local_loads(),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            remote_hits: self.remote_hits(),
            remote_failures: self.remote_failures(),
            evictions: self.evictions(),
            hit_ratio: self.hit_ratio(),
        }
    }
}

/// Metrics snapshot for reporting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub gets: u64,
    pub hits: u64,
    pub misses: u64,
    pub local_loads: u64,
    pub load_failures: u64,
    pub remote_hits: u64,
    pub remote_failures: u64,
    pub evictions: u64,
    pub hit_ratio: f64,
}

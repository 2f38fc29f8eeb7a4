//! Local Cache Tier
//!
//! In-process storage owned by each group.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 LocalCache                   │
//! │   parking_lot::Mutex ─▶ LruCache<ByteView>   │
//! │                          │                   │
//! │            eviction callback ─▶ GroupMetrics │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Entries are charged `len(key) + len(value)` bytes against the group's
//! budget; a budget of `0` disables eviction.

mod byteview;
mod local;
mod lru;
mod metrics;

#[cfg(test)]
mod proptest;

pub use byteview::ByteView;
pub use local::{LocalCache, LocalCacheStats};
pub use lru::{ByteSize, EvictionCallback, LruCache};
pub use metrics::{GroupMetrics, MetricsSnapshot};

/// Byte budget meaning "never evict"
pub const UNBOUNDED: i64 = 0;

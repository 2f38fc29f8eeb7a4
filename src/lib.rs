//! MeshCache - Distributed Read-Through Cache
//!
//! A library for building a cluster of cooperating cache processes. Each key
//! is owned by exactly one peer, chosen by a consistent hash ring; a miss on a
//! non-owner is forwarded to the owner over HTTP, and a miss on the owner is
//! filled from a user-supplied loader. Concurrent misses for the same key are
//! coalesced into a single load.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Group                                  │
//! │  ┌────────────┐   ┌──────────────────┐   ┌─────────────────────┐  │
//! │  │ LocalCache │   │ RequestCoalescer │   │ NodeSelector (once) │  │
//! │  │  (LRU)     │   │  (singleflight)  │   │   HttpPool / ...    │  │
//! │  └────────────┘   └──────────────────┘   └──────────┬──────────┘  │
//! └─────────────────────────────────────────────────────┼─────────────┘
//!                                                       │ HashRing
//!                                                       ▼
//!                                      NodeClient ──HTTP──▶ PeerServer
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - HTTP and in-memory implementations of the routing ports
//! - [`cache`] - Byte-bounded LRU and the thread-safe local cache
//! - [`domain`] - Ports (Loader, NodeSelector, NodeClient) and wire messages
//! - [`error`] - Error types
//! - [`flight`] - Per-key request coalescing
//! - [`group`] - Named cache groups and their registry
//! - [`metrics`] - Prometheus text exposition
//! - [`ring`] - Consistent hash ring

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod error;
pub mod flight;
pub mod group;
pub mod metrics;
pub mod ring;

// Re-export commonly used types
pub use adapters::{HttpPool, PeerServer, PoolConfig};
pub use cache::ByteView;
pub use domain::{loader_fn, Loader, NodeClient, NodeSelector};
pub use error::{Error, Result};
pub use group::{Group, GroupBuilder, GroupRegistry};
pub use ring::HashRing;

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

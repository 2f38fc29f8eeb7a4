//! Infrastructure Adapters
//!
//! Implementations of the domain ports, following the Port/Adapter
//! (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │        Loader │ NodeSelector │ NodeClient                   │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ HttpPool │ HttpNodeClient │ PeerServer                      │ │
//! │  │ InMemoryNode │ StaticSelector                               │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use meshcache::adapters::HttpPool;
//!
//! let pool = Arc::new(HttpPool::new("http://localhost:8001")?);
//! pool.set(["http://localhost:8001", "http://localhost:8002"]);
//! group.register_node_selector(pool)?;
//! ```

mod http_client;
mod http_pool;
mod http_server;
mod memory;

pub use http_client::HttpNodeClient;
pub use http_pool::{HttpPool, PoolConfig, DEFAULT_BASE_PATH, DEFAULT_REPLICAS};
pub use http_server::{PeerPath, PeerServer};
pub use memory::{InMemoryNode, StaticSelector};

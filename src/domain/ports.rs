//! Domain Ports (Port/Adapter Pattern)
//!
//! The three capabilities a [`Group`](crate::group::Group) depends on but
//! does not implement:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Group                             │
//! │   Loader            NodeSelector  ──▶  NodeClient          │
//! │   (system of record)  (who owns key)   (ask that node)     │
//! └────────────────────────────────────────────────────────────┘
//!            │                 │                  │
//!            ▼                 ▼                  ▼
//!      host service        HttpPool         HttpNodeClient
//!                       StaticSelector       InMemoryNode
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, Result};

// =============================================================================
// Wire Shapes
// =============================================================================

/// Logical request sent to a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRequest {
    pub group: String,
    pub key: String,
}

impl CacheRequest {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

/// Logical response returned by a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheResponse {
    pub value: Vec<u8>,
}

// =============================================================================
// Loader
// =============================================================================

/// Fetches a key's value from the system of record.
///
/// Errors are opaque to the cache and reach the caller of `Group::get`
/// unchanged.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError>;
}

/// [`Loader`] backed by an async closure, see [`loader_fn`]
pub struct LoaderFn<F> {
    f: F,
}

/// Adapt `Fn(String) -> impl Future<Output = Result<Vec<u8>, BoxError>>`
/// into a [`Loader`].
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Vec<u8>, BoxError>> + Send + 'static,
{
    LoaderFn { f }
}

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Vec<u8>, BoxError>> + Send + 'static,
{
    async fn load(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError> {
        (self.f)(key.to_string()).await
    }
}

impl<F> std::fmt::Debug for LoaderFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderFn").finish_non_exhaustive()
    }
}

// =============================================================================
// Node Routing
// =============================================================================

/// Issues a request to one specific node
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Fetch a value. Every transport failure maps to `Error::Remote`.
    async fn request(&self, request: &CacheRequest) -> Result<CacheResponse>;

    /// Address or name of the node, for logs
    fn node(&self) -> &str;
}

/// Picks the remote node responsible for a key.
///
/// Returns `None` when the key should be handled locally: no nodes are
/// configured, or the owner is this process. The local node is never
/// returned.
pub trait NodeSelector: Send + Sync {
    fn select_node(&self, key: &str) -> Option<Arc<dyn NodeClient>>;
}

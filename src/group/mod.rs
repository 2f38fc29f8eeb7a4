//! Cache Groups
//!
//! A [`Group`] is a named, read-through cache. Each group exclusively owns
//! one [`LocalCache`] and one [`RequestCoalescer`], and answers `get` with
//! the following state machine:
//!
//! ```text
//! get(key)
//!   ├─ key empty ───────────────────────────────▶ Err(InvalidKey)
//!   ├─ local hit ───────────────────────────────▶ Ok(value)
//!   └─ miss ─▶ coalesce(key)
//!                ├─ selector picks remote node
//!                │     ├─ remote ok ────────────▶ Ok(value)   (not cached here)
//!                │     └─ remote failed ─┐
//!                └─ no selector / local ─┴─▶ loader(key)
//!                                              ├─ ok ─▶ populate ─▶ Ok(value)
//!                                              └─ err ───────────▶ Err(Load)
//! ```
//!
//! Values fetched from a peer are not stored in the local
//! cache: only the owning node keeps a copy, so a non-owner calls its peer
//! (and, if the peer fails, the loader) on every miss.

mod registry;

pub use registry::GroupRegistry;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::cache::{ByteView, GroupMetrics, LocalCache, LocalCacheStats, MetricsSnapshot};
use crate::domain::{CacheRequest, Loader, NodeClient, NodeSelector};
use crate::error::{Error, Result};
use crate::flight::RequestCoalescer;

/// Default local cache budget for a group (2 KiB)
pub const DEFAULT_CACHE_BYTES: i64 = 2 << 10;

/// Named read-through cache
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    cache: LocalCache,
    selector: OnceCell<Arc<dyn NodeSelector>>,
    flight: RequestCoalescer<Result<ByteView>>,
    metrics: Arc<GroupMetrics>,
}

impl Group {
    /// Start building a group called `name`
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach the node selector used to route misses to peers.
    ///
    /// May be called once; a second call fails with
    /// `DuplicateRegistration` and leaves the first selector in place.
    pub fn register_node_selector(&self, selector: Arc<dyn NodeSelector>) -> Result<()> {
        self.selector.set(selector).map_err(|_| {
            Error::DuplicateRegistration(format!(
                "node selector already registered for group {}",
                self.name
            ))
        })
    }

    /// True once a node selector is attached
    pub fn has_node_selector(&self) -> bool {
        self.selector.get().is_some()
    }

    /// Get the value for `key`, loading it on a miss.
    #[instrument(skip(self), fields(group = %self.name))]
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        self.metrics.record_get();

        if let Some(value) = self.cache.get(key) {
            debug!("cache hit");
            self.metrics.record_hit();
            return Ok(value);
        }
        self.metrics.record_miss();

        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        self.flight
            .work(key, move || async move {
                if let Some(node) = self.selector.get().and_then(|s| s.select_node(key)) {
                    match self.get_from_node(node.as_ref(), key).await {
                        Ok(value) => {
                            self.metrics.record_remote_hit();
                            return Ok(value);
                        }
                        Err(e) => {
                            self.metrics.record_remote_failure();
                            warn!(node = node.node(), error = %e, "failed to get from node, loading locally");
                        }
                    }
                }

                self.get_locally(key).await
            })
            .await
    }

    async fn get_from_node(&self, node: &dyn NodeClient, key: &str) -> Result<ByteView> {
        debug!(node = node.node(), "fetching from node");
        let request = CacheRequest::new(self.name.as_str(), key);
        let response = node.request(&request).await?;
        Ok(ByteView::from(response.value))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.loader.load(key).await.map_err(|e| {
            self.metrics.record_load_failure();
            Error::load(e)
        })?;
        self.metrics.record_local_load();

        let value = ByteView::copy_from_slice(&bytes);
        self.cache.add(key, value.clone());
        Ok(value)
    }

    /// Local cache statistics
    pub fn cache_stats(&self) -> LocalCacheStats {
        self.cache.stats()
    }

    /// Counters for this group
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// True if `key` is currently held in the local cache
    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains(key)
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache", &self.cache.stats())
            .field("has_node_selector", &self.has_node_selector())
            .field("in_flight", &self.flight.in_flight())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Configures and constructs a [`Group`]
pub struct GroupBuilder {
    name: String,
    cache_bytes: i64,
    loader: Option<Arc<dyn Loader>>,
    selector: Option<Arc<dyn NodeSelector>>,
}

impl GroupBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_bytes: DEFAULT_CACHE_BYTES,
            loader: None,
            selector: None,
        }
    }

    /// Local cache budget in bytes (0 = unbounded)
    pub fn cache_bytes(mut self, cache_bytes: i64) -> Self {
        self.cache_bytes = cache_bytes;
        self
    }

    /// Loader for the system of record (required)
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Loader shared with other owners
    pub fn shared_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Node selector to register at construction
    pub fn node_selector(mut self, selector: Arc<dyn NodeSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Build a group without registering it anywhere
    pub fn build(self) -> Result<Group> {
        let loader = self
            .loader
            .ok_or_else(|| Error::MissingLoader(self.name.clone()))?;

        let metrics = Arc::new(GroupMetrics::new());
        let selector = OnceCell::new();
        if let Some(s) = self.selector {
            // Fresh cell, cannot already be set
            let _ = selector.set(s);
        }

        Ok(Group {
            cache: LocalCache::with_metrics(self.cache_bytes, Arc::clone(&metrics)),
            name: self.name,
            loader,
            selector,
            flight: RequestCoalescer::new(),
            metrics,
        })
    }

    /// Build the group and register it under its name
    pub fn register(self, registry: &GroupRegistry) -> Result<Arc<Group>> {
        registry.insert(self.build()?)
    }
}

// =============================================================================
// Tests
// =============================================================================

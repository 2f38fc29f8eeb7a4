//! In-Memory Routing Adapters
//!
//! Transport-free implementations of the routing ports, for tests and for
//! embedding several groups in one process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CacheRequest, CacheResponse, NodeClient, NodeSelector};
use crate::error::{Error, Result};
use crate::group::GroupRegistry;

enum Backend {
    Values(HashMap<String, Vec<u8>>),
    Registry(Arc<GroupRegistry>),
    Failing,
}

/// A node answered from memory
pub struct InMemoryNode {
    name: String,
    backend: Backend,
    requests: AtomicU64,
}

impl InMemoryNode {
    /// Node serving a fixed key → value table (any group)
    pub fn with_values<I, K>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        Self::new(
            name,
            Backend::Values(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        )
    }

    /// Node that answers from another registry's groups, like a peer server
    pub fn with_registry(name: impl Into<String>, registry: Arc<GroupRegistry>) -> Self {
        Self::new(name, Backend::Registry(registry))
    }

    /// Node whose every request fails
    pub fn failing(name: impl Into<String>) -> Self {
        Self::new(name, Backend::Failing)
    }

    fn new(name: impl Into<String>, backend: Backend) -> Self {
        Self {
            name: name.into(),
            backend,
            requests: AtomicU64::new(0),
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NodeClient for InMemoryNode {
    async fn request(&self, request: &CacheRequest) -> Result<CacheResponse> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let value = match &self.backend {
            Backend::Values(values) => values
                .get(&request.key)
                .cloned()
                .ok_or_else(|| Error::remote(&self.name, "server returned 404 Not Found"))?,
            Backend::Registry(registry) => {
                let group = registry
                    .get(&request.group)
                    .ok_or_else(|| Error::remote(&self.name, "server returned 404 Not Found"))?;
                group
                    .get(&request.key)
                    .await
                    .map_err(|e| Error::remote(&self.name, e))?
                    .to_vec()
            }
            Backend::Failing => return Err(Error::remote(&self.name, "connection refused")),
        };

        Ok(CacheResponse { value })
    }

    fn node(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for InMemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNode")
            .field("name", &self.name)
            .field("requests", &self.requests())
            .finish()
    }
}

/// Selector with a fixed answer for every key
pub struct StaticSelector {
    node: Option<Arc<dyn NodeClient>>,
}

impl StaticSelector {
    /// Always route to `node`
    pub fn remote(node: Arc<dyn NodeClient>) -> Self {
        Self { node: Some(node) }
    }

    /// Always handle locally
    pub fn local() -> Self {
        Self { node: None }
    }
}

impl NodeSelector for StaticSelector {
    fn select_node(&self, _key: &str) -> Option<Arc<dyn NodeClient>> {
        self.node.clone()
    }
}

impl std::fmt::Debug for StaticSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSelector")
            .field("node", &self.node.as_ref().map(|n| n.node().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::loader_fn;
    use crate::error::BoxError;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_values_node() {
        let node = InMemoryNode::with_values("peer", [("Tom", b"630".to_vec())]);

        let response = node.request(&CacheRequest::new("scores", "Tom")).await.unwrap();
        assert_eq!(response.value, b"630".to_vec());

        assert_matches!(
            node.request(&CacheRequest::new("scores", "Sam")).await,
            Err(Error::Remote { .. })
        );
        assert_eq!(node.requests(), 2);
    }

    #[tokio::test]
    async fn test_registry_node_serves_group() {
        let registry = Arc::new(GroupRegistry::new());
        registry
            .new_group(
                "scores",
                0,
                loader_fn(|key: String| async move { Ok::<_, BoxError>(key.into_bytes()) }),
            )
            .unwrap();
        let node = InMemoryNode::with_registry("peer", Arc::clone(&registry));

        let response = node.request(&CacheRequest::new("scores", "Sam")).await.unwrap();
        assert_eq!(response.value, b"Sam".to_vec());
        assert!(registry.get("scores").unwrap().is_cached("Sam"));

        assert_matches!(
            node.request(&CacheRequest::new("missing", "Sam")).await,
            Err(Error::Remote { .. })
        );
    }

    #[test]
    fn test_static_selector() {
        let node: Arc<dyn NodeClient> = Arc::new(InMemoryNode::failing("peer"));
        assert!(StaticSelector::local().select_node("k").is_none());
        assert_eq!(
            StaticSelector::remote(node).select_node("k").unwrap().node(),
            "peer"
        );
    }
}

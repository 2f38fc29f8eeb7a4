//! HTTP Node Pool
//!
//! Implements the [`NodeSelector`] port: a consistent hash ring over the peer
//! addresses plus one [`HttpNodeClient`] per peer. Both live behind a single
//! lock so a rebuild never interleaves with a lookup.
//!
//! The peer set is replaced wholesale by [`HttpPool::set`]; there is no
//! incremental add or remove.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tracing::{debug, info};

use super::http_client::HttpNodeClient;
use crate::domain::{NodeClient, NodeSelector};
use crate::error::{Error, Result};
use crate::ring::{HashFn, HashRing};

/// Default URL prefix for peer requests
pub const DEFAULT_BASE_PATH: &str = "/_zcache/";

/// Default virtual nodes per peer
pub const DEFAULT_REPLICAS: usize = 50;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// URL prefix shared by client and server, must start and end with `/`
    pub base_path: String,
    /// Virtual nodes per peer
    pub replicas: usize,
    /// Timeout for a single peer request
    pub request_timeout: Duration,
    /// Ring hash (None = CRC-32)
    pub hash: Option<HashFn>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            request_timeout: Duration::from_secs(5),
            hash: None,
        }
    }
}

impl PoolConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if !self.base_path.starts_with('/') || !self.base_path.ends_with('/') {
            return Err(Error::Config(format!(
                "base path must start and end with '/': {}",
                self.base_path
            )));
        }
        if self.replicas == 0 {
            return Err(Error::Config("replicas must be at least 1".to_string()));
        }
        Ok(())
    }
}

struct PoolState {
    ring: HashRing,
    clients: HashMap<String, Arc<HttpNodeClient>>,
}

/// Routes keys to peers over HTTP
pub struct HttpPool {
    /// This process's own address, never selected
    self_addr: String,
    config: PoolConfig,
    client: Client,
    state: RwLock<PoolState>,
}

impl HttpPool {
    /// Create a pool for the process reachable at `self_addr`
    pub fn new(self_addr: impl Into<String>) -> Result<Self> {
        Self::with_config(self_addr, PoolConfig::default())
    }

    /// Create a pool with custom configuration
    pub fn with_config(self_addr: impl Into<String>, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            self_addr: self_addr.into(),
            state: RwLock::new(PoolState {
                ring: HashRing::new(config.replicas, config.hash),
                clients: HashMap::new(),
            }),
            config,
            client,
        })
    }

    /// Replace the peer set. The list may include this process's address.
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut ring = HashRing::new(self.config.replicas, self.config.hash);
        ring.add(&peers);

        let clients = peers
            .iter()
            .map(|peer| {
                let client =
                    HttpNodeClient::new(peer.as_str(), &self.config.base_path, self.client.clone());
                (peer.clone(), Arc::new(client))
            })
            .collect();

        *self.state.write() = PoolState { ring, clients };
        info!(addr = %self.self_addr, peers = ?peers, "node pool updated");
    }

    /// This process's address
    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Configured peers, sorted
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.state.read().clients.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Owner of `key` on the ring, including this process
    pub fn owner(&self, key: &str) -> Option<String> {
        self.state.read().ring.get(key).map(str::to_string)
    }
}

impl NodeSelector for HttpPool {
    fn select_node(&self, key: &str) -> Option<Arc<dyn NodeClient>> {
        let state = self.state.read();
        let node = state.ring.get(key)?;
        if node == self.self_addr {
            return None;
        }

        debug!(addr = %self.self_addr, node, "select node");
        let client = state.clients.get(node)?;
        Some(Arc::clone(client) as Arc<dyn NodeClient>)
    }
}

impl std::fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_addr", &self.self_addr)
            .field("config", &self.config)
            .field("peers", &self.peers())
            .finish()
    }
}

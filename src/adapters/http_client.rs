//! HTTP Node Client
//!
//! Implements the [`NodeClient`] port over HTTP with `reqwest`.
//!
//! Request:  `GET {peer}{base_path}{escape(group)}/{escape(key)}`
//! Response: bincode-encoded [`CacheResponse`]

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::domain::{CacheRequest, CacheResponse, NodeClient};
use crate::error::{Error, Result};

/// Client for one peer
#[derive(Clone)]
pub struct HttpNodeClient {
    /// Peer address, e.g. `http://localhost:8002`
    node: String,
    /// `{node}{base_path}`
    base_url: String,
    client: Client,
}

impl HttpNodeClient {
    /// Create a client for `node` that shares `client`'s connection pool
    pub fn new(node: impl Into<String>, base_path: &str, client: Client) -> Self {
        let node = node.into();
        let base_url = format!("{}{}", node.trim_end_matches('/'), base_path);
        Self {
            node,
            base_url,
            client,
        }
    }

    /// URL for a request, with both segments escaped independently
    pub fn url_for(&self, request: &CacheRequest) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(&request.group),
            urlencoding::encode(&request.key)
        )
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    #[instrument(skip(self, request), fields(node = %self.node, group = %request.group))]
    async fn request(&self, request: &CacheRequest) -> Result<CacheResponse> {
        let url = self.url_for(request);
        debug!(%url, "requesting peer");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::remote(&self.node, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(
                &self.node,
                format!("server returned {}: {}", status, body.trim()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::remote(&self.node, format!("reading response body: {}", e)))?;

        bincode::deserialize(&body)
            .map_err(|e| Error::remote(&self.node, format!("decoding response body: {}", e)))
    }

    fn node(&self) -> &str {
        &self.node
    }
}

impl std::fmt::Debug for HttpNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNodeClient")
            .field("node", &self.node)
            .field("base_url", &self.base_url)
            .finish()
    }
}

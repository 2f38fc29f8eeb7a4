//! HTTP Peer Server
//!
//! Serves this process's groups to other peers over HTTP/1 with `hyper`.
//!
//! ```text
//! GET {base_path}{group}/{key}
//!   200  application/octet-stream   bincode CacheResponse
//!   400  text/plain                 path outside base_path, or no key
//!   404  text/plain                 unknown group
//!   500  text/plain                 group get failed
//! GET /healthz
//!   200  ok
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::domain::CacheResponse;
use crate::error::{Error, Result};
use crate::group::GroupRegistry;

/// A parsed peer request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPath {
    pub group: String,
    pub key: String,
}

impl PeerPath {
    /// Parse `{base_path}{group}/{key}`. Everything after the first `/`
    /// following the group belongs to the key; both are percent-decoded.
    pub fn parse(path: &str, base_path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(base_path)
            .ok_or_else(|| Error::BadRequest(format!("unexpected path: {}", path)))?;

        let (group, key) = rest
            .split_once('/')
            .ok_or_else(|| Error::BadRequest(format!("bad request: {}", path)))?;

        let group = decode(group)?;
        let key = decode(key)?;
        if group.is_empty() || key.is_empty() {
            return Err(Error::BadRequest(format!("bad request: {}", path)));
        }

        Ok(Self { group, key })
    }
}

fn decode(segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| Error::BadRequest(format!("invalid path encoding: {}", e)))
}

/// Build a response without going through the fallible builder
fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn text(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    respond(status, "text/plain; charset=utf-8", body.into())
}

/// Serves a registry's groups to peers
pub struct PeerServer {
    registry: Arc<GroupRegistry>,
    base_path: String,
}

impl PeerServer {
    /// Create a server for `registry` under `base_path`
    pub fn new(registry: Arc<GroupRegistry>, base_path: impl Into<String>) -> Self {
        Self {
            registry,
            base_path: base_path.into(),
        }
    }

    /// URL prefix served
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Answer a peer request for `path`
    pub async fn handle(&self, path: &str) -> Response<Full<Bytes>> {
        let request = match PeerPath::parse(path, &self.base_path) {
            Ok(request) => request,
            Err(e) => {
                debug!(path, error = %e, "rejecting peer request");
                return text(StatusCode::BAD_REQUEST, e.to_string());
            }
        };

        let Some(group) = self.registry.get(&request.group) else {
            let err = Error::GroupNotFound(request.group);
            return text(StatusCode::NOT_FOUND, err.to_string());
        };

        let view = match group.get(&request.key).await {
            Ok(view) => view,
            Err(e) => {
                warn!(group = %request.group, key = %request.key, error = %e, "peer get failed");
                return text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        };

        let body = CacheResponse {
            value: view.to_vec(),
        };
        match bincode::serialize(&body) {
            Ok(bytes) => respond(StatusCode::OK, "application/octet-stream", bytes),
            Err(e) => text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }

    async fn route(&self, req: Request<hyper::body::Incoming>) -> Response<Full<Bytes>> {
        let path = req.uri().path().to_string();
        debug!(method = %req.method(), %path, "peer request");
        drop(req);
        match path.as_str() {
            "/healthz" => text(StatusCode::OK, "ok"),
            path => self.handle(path).await,
        }
    }

    /// Accept connections on `listener` until an accept error
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let addr = listener
            .local_addr()
            .map_err(|e| Error::Internal(format!("Peer server address error: {}", e)))?;
        info!("Peer server listening on {}{}", addr, self.base_path);

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| Error::Internal(format!("Peer server accept error: {}", e)))?;

            let io = TokioIo::new(stream);
            let server = Arc::clone(&self);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { Ok::<_, Infallible>(server.route(req).await) }
                });
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Peer server connection error: {}", e);
                }
            });
        }
    }
}

impl std::fmt::Debug for PeerServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerServer")
            .field("base_path", &self.base_path)
            .field("groups", &self.registry.names())
            .finish()
    }
}

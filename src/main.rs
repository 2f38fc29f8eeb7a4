//! MeshCache Node
//!
//! Runs one process of a MeshCache cluster serving the demo `scores` group.
//!
//! # Modes
//!
//! ```text
//!                    GET /api?key=Tom
//!  client ──────────────────────────▶ API server (--api)
//!                                        │ HttpPool (consistent hash)
//!                     ┌──────────────────┼──────────────────┐
//!                     ▼                  ▼                  ▼
//!               peer :8001         peer :8002         peer :8003
//!              GET /_zcache/scores/Tom ──▶ loader (score table)
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshcache::adapters::{HttpPool, PeerServer, PoolConfig};
use meshcache::domain::loader_fn;
use meshcache::error::BoxError;
use meshcache::group::{Group, GroupRegistry};
use meshcache::metrics::render_prometheus;

// =============================================================================
// CLI Arguments
// =============================================================================

/// MeshCache - distributed read-through cache node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port of this cache peer
    #[arg(long, env = "MESHCACHE_PORT", default_value = "8001")]
    port: u16,

    /// Run the front API server instead of a cache peer
    #[arg(long, env = "MESHCACHE_API")]
    api: bool,

    /// Address of the front API server
    #[arg(long, env = "MESHCACHE_API_ADDR", default_value = "http://localhost:9999")]
    api_addr: String,

    /// Peer addresses, comma separated
    #[arg(
        long,
        env = "MESHCACHE_PEERS",
        value_delimiter = ',',
        default_value = "http://localhost:8001,http://localhost:8002,http://localhost:8003"
    )]
    peers: Vec<String>,

    /// Name of the demo group
    #[arg(long, env = "MESHCACHE_GROUP", default_value = "scores")]
    group: String,

    /// Local cache budget in bytes (0 = unbounded)
    #[arg(long, env = "MESHCACHE_CACHE_BYTES", default_value = "2048")]
    cache_bytes: i64,

    /// URL prefix for peer requests
    #[arg(long, env = "MESHCACHE_BASE_PATH", default_value = meshcache::adapters::DEFAULT_BASE_PATH)]
    base_path: String,

    /// Virtual nodes per peer on the hash ring
    #[arg(long, env = "MESHCACHE_REPLICAS", default_value = "50")]
    replicas: usize,

    /// Metrics server address (disabled when unset)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting MeshCache {}", meshcache::version());
    info!("  Group: {} ({} bytes)", args.group, args.cache_bytes);
    info!("  Peers: {:?}", args.peers);

    let registry = Arc::new(GroupRegistry::new());
    let group = Group::builder(args.group.as_str())
        .cache_bytes(args.cache_bytes)
        .loader(loader_fn(load_score))
        .register(&registry)?;

    if let Some(addr) = args.metrics_addr.clone() {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(&addr, registry).await {
                error!("Metrics server error: {:#}", e);
            }
        });
    }

    if args.api {
        let config = PoolConfig {
            base_path: args.base_path.clone(),
            replicas: args.replicas,
            ..Default::default()
        };
        let pool = Arc::new(HttpPool::with_config(args.api_addr.as_str(), config)?);
        pool.set(args.peers.iter().cloned());
        group.register_node_selector(pool)?;

        run_api_server(&args.api_addr, group).await
    } else {
        let addr = format!("http://localhost:{}", args.port);
        info!("Cache peer {} starting", addr);

        let listener = TcpListener::bind(("0.0.0.0", args.port))
            .await
            .with_context(|| format!("Failed to bind cache peer on port {}", args.port))?;
        let server = Arc::new(PeerServer::new(registry, args.base_path.as_str()));
        server.serve(listener).await?;
        Ok(())
    }
}

// =============================================================================
// Demo Loader
// =============================================================================

async fn load_score(key: String) -> Result<Vec<u8>, BoxError> {
    let db: HashMap<&str, &str> = [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
        .into_iter()
        .collect();

    info!(%key, "[DB] search key");
    match db.get(key.as_str()) {
        Some(score) => Ok(score.as_bytes().to_vec()),
        None => Err(format!("{} not exist", key).into()),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn"] {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("invalid log directive {}: {}", directive, e),
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// HTTP helpers
// =============================================================================

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

/// `http://host:port` → `host:port`
fn listen_addr(addr: &str) -> &str {
    addr.trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/')
}

/// Value of `name` in a query string, percent-decoded
fn query_param(query: Option<&str>, name: &str) -> String {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| urlencoding::decode(&v.replace('+', " ")).ok().map(|v| v.into_owned()))
        .unwrap_or_default()
}

// =============================================================================
// API Server
// =============================================================================

async fn run_api_server(addr: &str, group: Arc<Group>) -> anyhow::Result<()> {
    async fn api_handler(
        group: Arc<Group>,
        req: Request<hyper::body::Incoming>,
    ) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
        if req.uri().path() != "/api" {
            return Ok(respond(StatusCode::NOT_FOUND, "text/plain", "not found"));
        }

        let key = query_param(req.uri().query(), "key");
        drop(req);

        let response = match group.get(&key).await {
            Ok(view) => respond(StatusCode::OK, "application/octet-stream", view.to_vec()),
            Err(e) => {
                warn!(%key, error = %e, "api get failed");
                respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string())
            }
        };
        Ok(response)
    }

    let listener = TcpListener::bind(listen_addr(addr))
        .await
        .with_context(|| format!("Failed to bind API server on {}", addr))?;

    info!("API server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("API server accept error")?;

        let io = TokioIo::new(stream);
        let group = Arc::clone(&group);

        tokio::spawn(async move {
            let service = service_fn(move |req| api_handler(Arc::clone(&group), req));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("API server connection error: {}", e);
            }
        });
    }
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, registry: Arc<GroupRegistry>) -> anyhow::Result<()> {
    async fn metrics_handler(
        registry: Arc<GroupRegistry>,
        req: Request<hyper::body::Incoming>,
    ) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
        let response = match req.uri().path() {
            "/metrics" => match render_prometheus(&registry) {
                Ok(text) => respond(StatusCode::OK, "text/plain; version=0.0.4", text),
                Err(e) => respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", e.to_string()),
            },
            "/healthz" => respond(StatusCode::OK, "text/plain", "ok"),
            _ => respond(StatusCode::NOT_FOUND, "text/plain", "not found"),
        };
        Ok(response)
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server on {}", addr))?;

    info!("Metrics server listening on {}", addr);

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("Metrics server accept error")?;

        let io = TokioIo::new(stream);
        let registry = Arc::clone(&registry);

        tokio::spawn(async move {
            let service = service_fn(move |req| metrics_handler(Arc::clone(&registry), req));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Metrics server connection error: {}", e);
            }
        });
    }
}

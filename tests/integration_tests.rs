//! MeshCache Integration Tests
//!
//! End-to-end tests over real HTTP peers bound to `127.0.0.1:0`:
//! - Feature 1: Key ownership and routing through the hash ring
//! - Feature 2: Failure handling and fallback
//! - Feature 3: In-process clusters without a transport

use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use meshcache::adapters::{HttpNodeClient, HttpPool, InMemoryNode, PeerServer, StaticSelector};
use meshcache::domain::{loader_fn, CacheRequest, Loader, NodeClient};
use meshcache::error::BoxError;
use meshcache::{Error, Group, GroupRegistry};
use tokio::net::TcpListener;

const BASE: &str = "/_zcache/";

/// Score table loader that counts calls per key
fn score_loader(calls: Arc<parking_lot::Mutex<HashMap<String, usize>>>) -> impl Loader + 'static {
    loader_fn(move |key: String| {
        let calls = Arc::clone(&calls);
        async move {
            *calls.lock().entry(key.clone()).or_default() += 1;
            match key.as_str() {
                "Tom" => Ok(b"630".to_vec()),
                "Jack" => Ok(b"589".to_vec()),
                "Sam" => Ok(b"567".to_vec()),
                _ => Err::<Vec<u8>, BoxError>(format!("{} not exist", key).into()),
            }
        }
    })
}

fn echo_loader() -> impl Loader + 'static {
    loader_fn(|key: String| async move { Ok::<_, BoxError>(key.into_bytes()) })
}

struct Peer {
    addr: String,
    registry: Arc<GroupRegistry>,
    calls: Arc<parking_lot::Mutex<HashMap<String, usize>>>,
}

impl Peer {
    fn group(&self) -> Arc<Group> {
        self.registry.get("scores").unwrap()
    }

    fn loads(&self, key: &str) -> usize {
        self.calls.lock().get(key).copied().unwrap_or(0)
    }
}

/// Bind a listener, then start a peer serving the `scores` group on it
async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    (listener, addr)
}

fn start_peer(listener: TcpListener, addr: String) -> Peer {
    let registry = Arc::new(GroupRegistry::new());
    let calls = Arc::new(parking_lot::Mutex::new(HashMap::new()));
    registry
        .new_group("scores", 2 << 10, score_loader(Arc::clone(&calls)))
        .unwrap();

    let server = Arc::new(PeerServer::new(Arc::clone(&registry), BASE));
    tokio::spawn(server.serve(listener));

    Peer {
        addr,
        registry,
        calls,
    }
}

/// Three peers that route among themselves
async fn start_cluster() -> Vec<Peer> {
    let mut bound = Vec::new();
    for _ in 0..3 {
        bound.push(bind().await);
    }
    let addrs: Vec<String> = bound.iter().map(|(_, addr)| addr.clone()).collect();

    bound
        .into_iter()
        .map(|(listener, addr)| {
            let peer = start_peer(listener, addr);
            let pool = Arc::new(HttpPool::new(peer.addr.as_str()).unwrap());
            pool.set(addrs.iter().cloned());
            peer.group().register_node_selector(pool).unwrap();
            peer
        })
        .collect()
}

/// A front group that owns no keys and always asks the cluster
fn front(addrs: &[String], calls: Arc<parking_lot::Mutex<HashMap<String, usize>>>) -> Arc<Group> {
    let pool = Arc::new(HttpPool::new("http://front.invalid").unwrap());
    pool.set(addrs.iter().cloned());
    Arc::new(
        Group::builder("scores")
            .loader(score_loader(calls))
            .node_selector(pool)
            .build()
            .unwrap(),
    )
}

// =============================================================================
// Feature 1: Key Ownership and Routing
// =============================================================================

mod routing_tests {
    use super::*;

    #[tokio::test]
    async fn test_owner_loads_and_caches() {
        let peers = start_cluster().await;
        let addrs: Vec<String> = peers.iter().map(|p| p.addr.clone()).collect();
        let front_calls = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let front = front(&addrs, Arc::clone(&front_calls));

        assert_eq!(front.get("Tom").await.unwrap().to_string(), "630");
        assert_eq!(front.get("Tom").await.unwrap().to_string(), "630");

        // Only the owner holds the value, and it loaded it once
        let pool = HttpPool::new("http://front.invalid").unwrap();
        pool.set(addrs.iter().cloned());
        let owner = pool.owner("Tom").unwrap();
        for peer in &peers {
            if peer.addr == owner {
                assert!(peer.group().is_cached("Tom"));
                assert_eq!(peer.loads("Tom"), 1);
            } else {
                assert!(!peer.group().is_cached("Tom"));
                assert_eq!(peer.loads("Tom"), 0);
            }
        }

        assert!(!front.is_cached("Tom"));
        assert!(front_calls.lock().is_empty());
        assert_eq!(front.metrics().remote_hits, 2);
    }

    #[tokio::test]
    async fn test_non_owner_peer_forwards() {
        let peers = start_cluster().await;

        for key in ["Tom", "Jack", "Sam"] {
            for peer in &peers {
                assert!(!peer.group().get(key).await.unwrap().is_empty());
            }
            let total: usize = peers.iter().map(|p| p.loads(key)).sum();
            assert_eq!(total, 1, "{} loaded more than once", key);

            let cached = peers.iter().filter(|p| p.group().is_cached(key)).count();
            assert_eq!(cached, 1);
        }
    }

    #[tokio::test]
    async fn test_concurrent_front_gets_load_once() {
        let peers = start_cluster().await;
        let addrs: Vec<String> = peers.iter().map(|p| p.addr.clone()).collect();
        let front = front(&addrs, Arc::new(parking_lot::Mutex::new(HashMap::new())));

        let gets = (0..10).map(|_| {
            let front = Arc::clone(&front);
            async move { front.get("Sam").await }
        });
        for result in futures::future::join_all(gets).await {
            assert_eq!(result.unwrap().to_string(), "567");
        }

        let total: usize = peers.iter().map(|p| p.loads("Sam")).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_keys_with_reserved_characters() {
        let (listener, addr) = bind().await;
        let registry = Arc::new(GroupRegistry::new());
        registry.new_group("my group", 0, echo_loader()).unwrap();
        tokio::spawn(Arc::new(PeerServer::new(registry, BASE)).serve(listener));

        let client = HttpNodeClient::new(addr.as_str(), BASE, reqwest::Client::new());
        let response = client
            .request(&CacheRequest::new("my group", "a/b c?d"))
            .await
            .unwrap();
        assert_eq!(response.value, b"a/b c?d".to_vec());
    }

    #[tokio::test]
    async fn test_healthz() {
        let (listener, addr) = bind().await;
        let _peer = start_peer(listener, addr.clone());

        let response = reqwest::get(format!("{}/healthz", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");
    }
}

// =============================================================================
// Feature 2: Failure Handling
// =============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_dead_peer_falls_back_to_loader() {
        // Bind then drop so nothing listens there
        let (listener, dead) = bind().await;
        drop(listener);

        let calls = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let front = front(&[dead], Arc::clone(&calls));

        assert_eq!(front.get("Jack").await.unwrap().to_string(), "589");
        assert!(front.is_cached("Jack"));
        assert_eq!(calls.lock().get("Jack").copied(), Some(1));
        assert_eq!(front.metrics().remote_failures, 1);
    }

    #[tokio::test]
    async fn test_unknown_group_is_remote_error() {
        let (listener, addr) = bind().await;
        let _peer = start_peer(listener, addr.clone());

        let client = HttpNodeClient::new(addr.as_str(), BASE, reqwest::Client::new());
        let err = client
            .request(&CacheRequest::new("users", "Tom"))
            .await
            .unwrap_err();
        assert_matches!(&err, Error::Remote { reason, .. } if reason.contains("404"));
    }

    #[tokio::test]
    async fn test_owner_load_error_reaches_caller() {
        let (listener, addr) = bind().await;
        let _peer = start_peer(listener, addr.clone());

        let client = HttpNodeClient::new(addr.as_str(), BASE, reqwest::Client::new());
        let err = client
            .request(&CacheRequest::new("scores", "Kate"))
            .await
            .unwrap_err();
        assert_matches!(&err, Error::Remote { reason, .. } if reason.contains("Kate not exist"));

        // The front falls back to its own loader, which fails the same way
        let front = front(&[addr], Arc::new(parking_lot::Mutex::new(HashMap::new())));
        let err = front.get("Kate").await.unwrap_err();
        assert_matches!(err, Error::Load(_));
        assert_eq!(err.to_string(), "Kate not exist");
    }

    #[tokio::test]
    async fn test_bad_path_is_rejected() {
        let (listener, addr) = bind().await;
        let _peer = start_peer(listener, addr.clone());

        let response = reqwest::get(format!("{}/other/scores/Tom", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = reqwest::get(format!("{}{}scores", addr, BASE)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Feature 3: In-Process Clusters
// =============================================================================

mod in_memory_tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_backed_node() {
        let owner = Arc::new(GroupRegistry::new());
        let calls = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        owner
            .new_group("scores", 0, score_loader(Arc::clone(&calls)))
            .unwrap();

        let node = Arc::new(InMemoryNode::with_registry("owner", Arc::clone(&owner)));
        let front = Group::builder("scores")
            .loader(echo_loader())
            .node_selector(Arc::new(StaticSelector::remote(node.clone())))
            .build()
            .unwrap();

        for _ in 0..3 {
            assert_eq!(front.get("Tom").await.unwrap().to_string(), "630");
        }
        assert_eq!(node.requests(), 3);
        assert_eq!(calls.lock().get("Tom").copied(), Some(1));
        assert!(owner.get("scores").unwrap().is_cached("Tom"));
        assert!(!front.is_cached("Tom"));
    }

    #[tokio::test]
    async fn test_metrics_after_traffic() {
        let registry = GroupRegistry::new();
        let group = registry.new_group("scores", 0, echo_loader()).unwrap();
        group.get("a").await.unwrap();
        group.get("a").await.unwrap();
        group.get("b").await.unwrap();

        let snapshot = group.metrics();
        assert_eq!(snapshot.gets, 3);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.local_loads, 2);

        let text = meshcache::metrics::render_prometheus(&registry).unwrap();
        assert!(text.contains("meshcache_misses_total{group=\"scores\"} 2"));
    }
}

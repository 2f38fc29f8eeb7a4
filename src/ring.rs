//! Consistent Hash Ring
//!
//! Maps keys to node names with virtual-node replication on a sorted ring.
//! Identical `(replicas, hash, nodes)` inputs always produce the same ring,
//! so independent processes agree on key ownership without coordination.
//!
//! # Placement
//!
//! ```text
//! node "A", replicas 3 ─▶ hash("0A"), hash("1A"), hash("2A")
//!
//!        0 ──────────────────────────────────────── u32::MAX
//!        │   ●A      ●B    ◆key ─▶ ●A     ●B    ●A  │
//!        └──────────────── wraps around ─────────────┘
//! ```
//!
//! A key is owned by the first virtual point at or after its hash.
//!
//! The ring is not synchronised; owners serialise `add` against `get`.

use std::collections::HashMap;

/// Hash function used to place virtual nodes and keys
pub type HashFn = fn(&[u8]) -> u32;

/// CRC-32 (IEEE), the default placement hash
pub fn default_hash(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Consistent hash ring
#[derive(Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Sorted virtual-node positions
    ring: Vec<u32>,
    /// Position → node name
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Create an empty ring. `hash = None` selects [`default_hash`].
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        Self {
            hash: hash.unwrap_or(default_hash),
            replicas,
            ring: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Add nodes, each at `replicas` virtual positions `hash(i ++ node)`.
    ///
    /// A position collision silently hands the slot to the later node.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in nodes {
            let node = node.as_ref();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{}{}", i, node).as_bytes());
                self.ring.push(position);
                self.owners.insert(position, node.to_string());
            }
        }
        self.ring.sort_unstable();
    }

    /// Node owning `key`, or `None` when the ring is empty
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.ring.partition_point(|&position| position < hash) % self.ring.len();
        self.owners.get(&self.ring[idx]).map(String::as_str)
    }

    /// Number of virtual positions
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True when no node has been added
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Virtual positions per node
    pub fn replicas(&self) -> usize {
        self.replicas
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("positions", &self.ring.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

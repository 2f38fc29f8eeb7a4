//! LRU Cache - Byte-Budgeted Eviction Engine
//!
//! Strict least-recently-used cache whose capacity is measured in bytes
//! (`len(key) + len(value)` per entry) rather than entry count.
//!
//! # Design
//!
//! - Recency list is a doubly-linked list threaded through a slot vector
//!   (indices instead of pointers, freed slots are reused)
//! - Key index gives O(1) lookup into the list
//! - Capacity `0` means unbounded
//! - No internal locking; see [`super::local::LocalCache`] for the
//!   mutex-guarded wrapper

use std::collections::HashMap;

/// Values stored in an [`LruCache`] report their size in bytes.
pub trait ByteSize {
    /// Size of the value in bytes
    fn byte_size(&self) -> usize;
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for Vec<u8> {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for &str {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

/// Invoked synchronously with each evicted entry. Must not touch the cache.
pub type EvictionCallback<V> = Box<dyn FnMut(&str, &V) + Send>;

struct Node<V> {
    key: String,
    value: V,
    /// Towards the most-recently-used end
    prev: Option<usize>,
    /// Towards the least-recently-used end
    next: Option<usize>,
}

/// Byte-budgeted LRU cache
pub struct LruCache<V> {
    /// Maximum bytes (0 = unbounded)
    capacity_bytes: i64,
    /// Sum of `len(key) + len(value)` over live entries
    used_bytes: i64,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used
    tail: Option<usize>,
    on_evict: Option<EvictionCallback<V>>,
}

fn entry_size<V: ByteSize>(key: &str, value: &V) -> i64 {
    (key.len() + value.byte_size()) as i64
}

impl<V: ByteSize> LruCache<V> {
    /// Create a cache holding at most `capacity_bytes` (0 = unbounded)
    pub fn new(capacity_bytes: i64) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            on_evict: None,
        }
    }

    /// Create a cache that reports every eviction to `on_evict`
    pub fn with_eviction_callback(capacity_bytes: i64, on_evict: EvictionCallback<V>) -> Self {
        let mut cache = Self::new(capacity_bytes);
        cache.on_evict = Some(on_evict);
        cache
    }

    /// Insert or update `key`, mark it most recently used, then evict from
    /// the least-recently-used end until the byte budget holds.
    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();

        if let Some(&idx) = self.index.get(&key) {
            let new_size = value.byte_size() as i64;
            if let Some(node) = self.slot_mut(idx) {
                let old = std::mem::replace(&mut node.value, value);
                self.used_bytes += new_size - old.byte_size() as i64;
            }
            self.touch(idx);
        } else {
            self.used_bytes += entry_size(&key, &value);
            let idx = self.alloc(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.index.insert(key, idx);
            self.push_front(idx);
        }

        while self.capacity_bytes != 0 && self.used_bytes > self.capacity_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    /// Look up `key`; a hit becomes the most recently used entry.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        self.slot(idx).map(|node| &node.value)
    }

    /// Evict the least recently used entry, firing the eviction callback.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let idx = self.tail?;
        let node = self.unlink(idx)?;
        self.used_bytes -= entry_size(&node.key, &node.value);

        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(&node.key, &node.value);
        }

        Some((node.key, node.value))
    }

    /// Remove `key` without treating it as an eviction
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = *self.index.get(key)?;
        let node = self.unlink(idx)?;
        self.used_bytes -= entry_size(&node.key, &node.value);
        Some(node.value)
    }
}

impl<V> LruCache<V> {
    /// Check if the cache holds `key` without touching recency
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently accounted
    pub fn used_bytes(&self) -> i64 {
        self.used_bytes
    }

    /// Configured budget (0 = unbounded)
    pub fn capacity_bytes(&self) -> i64 {
        self.capacity_bytes
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.slot(cursor?)?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    fn slot(&self, idx: usize) -> Option<&Node<V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, idx: usize) -> Option<&mut Node<V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn alloc(&mut self, node: Node<V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Detach `idx` from the list, free its slot and drop it from the index
    fn unlink(&mut self, idx: usize) -> Option<Node<V>> {
        self.detach(idx);
        let node = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.index.remove(&node.key);
        Some(node)
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.detach(idx);
            self.push_front(idx);
        }
    }

    fn detach(&mut self, idx: usize) {
        let Some((prev, next)) = self.slot(idx).map(|node| (node.prev, node.next)) else {
            return;
        };

        match prev.and_then(|p| self.slot_mut(p)) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.slot_mut(n)) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.slot_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slot_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|h| self.slot_mut(h)) {
            Some(node) => node.prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}

impl<V> std::fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity_bytes", &self.capacity_bytes)
            .field("used_bytes", &self.used_bytes)
            .field("entries", &self.len())
            .field("on_evict", &self.on_evict.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

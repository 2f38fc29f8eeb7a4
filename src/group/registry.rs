//! Group Registry
//!
//! Explicitly owned name → group table. Created at process start and shared
//! by reference with whatever builds groups or serves peers. Reads take the
//! read lock; only registration takes the write lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::{Group, GroupBuilder};
use crate::domain::Loader;
use crate::error::{Error, Result};

/// Named groups of this process
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a group with `loader` and a `cache_bytes` budget, and register it
    pub fn new_group(
        &self,
        name: impl Into<String>,
        cache_bytes: i64,
        loader: impl Loader + 'static,
    ) -> Result<Arc<Group>> {
        GroupBuilder::new(name)
            .cache_bytes(cache_bytes)
            .loader(loader)
            .register(self)
    }

    /// Register a built group. Names are unique.
    pub fn insert(&self, group: Group) -> Result<Arc<Group>> {
        let mut groups = self.groups.write();
        if groups.contains_key(group.name()) {
            return Err(Error::DuplicateRegistration(format!(
                "group {} already exists",
                group.name()
            )));
        }

        let group = Arc::new(group);
        groups.insert(group.name().to_string(), Arc::clone(&group));
        info!(group = group.name(), "registered cache group");
        Ok(group)
    }

    /// Look up a group by name
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered groups, sorted by name
    pub fn groups(&self) -> Vec<Arc<Group>> {
        let mut groups: Vec<Arc<Group>> = self.groups.read().values().cloned().collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        groups
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Check if no group is registered
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl std::fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.names())
            .finish()
    }
}

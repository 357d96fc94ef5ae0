//! Group Registry
//!
//! Maps namespace names to their `Group`. One registry is created at startup and
//! shared (as `Arc<GroupRegistry>`) with everything that resolves groups by
//! name, most notably the peer HTTP handler.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::group::Group;
use crate::error::Result;

/// Registry holding every group served by this node.
///
/// Lookups take the lock shared; registration takes it exclusively.
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Builds a group with a `cache_bytes` budget and registers it, replacing any
    /// group already registered under `name`.
    ///
    /// `cache_bytes` must be non-zero; use `Group::builder(..).unbounded_cache()`
    /// together with [`GroupRegistry::insert`] to disable eviction.
    pub fn new_group<F, Fut>(
        &self,
        name: impl Into<String>,
        cache_bytes: u64,
        loader: F,
    ) -> Result<Arc<Group>>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
    {
        let group = Group::builder(name)
            .cache_bytes(cache_bytes)
            .loader(loader)
            .build()?;
        Ok(self.insert(group))
    }

    /// Registers an already built group, replacing any previous one of the same name.
    pub fn insert(&self, group: Group) -> Arc<Group> {
        let group = Arc::new(group);
        let previous = self
            .groups
            .write()
            .insert(group.name().to_string(), group.clone());

        if previous.is_some() {
            tracing::info!("Replaced group: {}", group.name());
        } else {
            tracing::info!("Registered group: {}", group.name());
        }
        group
    }

    /// Looks up a group by name. `None` means no such group is registered.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    pub fn remove_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.write().remove(name)
    }

    /// Returns the names of all registered groups.
    pub fn names(&self) -> Vec<String> {
        self.groups.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }
}

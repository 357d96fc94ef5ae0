use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Type alias for the source-of-truth loader of a group.
/// It takes the key and returns a Future resolving to the value bytes.
pub type LoaderFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send>> + Send + Sync>;

/// Wraps an async closure into a `LoaderFn`, type-erasing its Future.
pub fn loader_fn<F, Fut>(loader: F) -> LoaderFn
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    Arc::new(move |key: String| {
        Box::pin(loader(key)) as Pin<Box<dyn Future<Output = anyhow::Result<Vec<u8>>> + Send>>
    })
}

/// What a non-owning node does with a value it fetched from the owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerCachePolicy {
    /// Only the owning node caches a key; peer values are returned, not stored.
    #[default]
    OwnerOnly,
    /// Peer values are also stored in the local cache.
    Populate,
}

/// Per-group counters, updated lock-free on the read path.
#[derive(Debug, Default)]
pub struct GroupStats {
    pub gets: AtomicU64,
    pub hits: AtomicU64,
    pub peer_loads: AtomicU64,
    pub peer_errors: AtomicU64,
    pub local_loads: AtomicU64,
    pub local_load_errors: AtomicU64,
    pub evictions: AtomicU64,
}

/// Point-in-time copy of `GroupStats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStatsSnapshot {
    pub gets: u64,
    pub hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub local_loads: u64,
    pub local_load_errors: u64,
    pub evictions: u64,
    pub cached_entries: usize,
    pub cached_bytes: u64,
}

impl GroupStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, cached_entries: usize, cached_bytes: u64) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errors: self.local_load_errors.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            cached_entries,
            cached_bytes,
        }
    }
}

use std::future::Future;
use std::num::NonZeroU64;
use std::sync::{Arc, OnceLock};

use super::types::{GroupStats, GroupStatsSnapshot, LoaderFn, PeerCachePolicy, loader_fn};
use crate::cache::{ByteView, LocalCache, LruCache};
use crate::error::{CacheError, Result};
use crate::peers::{FetchRequest, PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;

/// A cache namespace.
///
/// Reads go local cache → owning peer → source-of-truth loader. Concurrent
/// misses on the same key are coalesced into one load.
pub struct Group {
    name: String,
    loader: LoaderFn,
    main_cache: LocalCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<Result<ByteView>>,
    peer_policy: PeerCachePolicy,
    stats: Arc<GroupStats>,
}

impl Group {
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value for `key`, loading it on a miss.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key is required".to_string()));
        }
        GroupStats::incr(&self.stats.gets);

        if let Some(view) = self.main_cache.get(key) {
            GroupStats::incr(&self.stats.hits);
            tracing::debug!("[{}] cache hit: {}", self.name, key);
            return Ok(view);
        }

        self.load(key).await
    }

    /// Attaches the peer picker. Allowed once per group.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) -> Result<()> {
        self.peers.set(peers).map_err(|_| {
            CacheError::Config(format!(
                "peers already registered for group {}",
                self.name
            ))
        })
    }

    pub fn has_peers(&self) -> bool {
        self.peers.get().is_some()
    }

    pub fn peer_cache_policy(&self) -> PeerCachePolicy {
        self.peer_policy
    }

    pub fn stats(&self) -> GroupStatsSnapshot {
        self.stats
            .snapshot(self.main_cache.len(), self.main_cache.bytes())
    }

    /// Whether `key` currently sits in this node's local cache.
    pub fn is_cached(&self, key: &str) -> bool {
        self.main_cache.contains(key)
    }

    pub fn cached_entries(&self) -> usize {
        self.main_cache.len()
    }

    pub fn cached_bytes(&self) -> u64 {
        self.main_cache.bytes()
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        self.flight
            .work(key, || async {
                if let Some(peer) = self.peers.get().and_then(|p| p.pick_peer(key)) {
                    match self.get_from_peer(peer.as_ref(), key).await {
                        Ok(view) => {
                            GroupStats::incr(&self.stats.peer_loads);
                            if self.peer_policy == PeerCachePolicy::Populate {
                                self.populate_cache(key, view.clone());
                            }
                            return Ok(view);
                        }
                        Err(e) => {
                            GroupStats::incr(&self.stats.peer_errors);
                            tracing::warn!(
                                "[{}] failed to get {} from peer {}: {}",
                                self.name,
                                key,
                                peer.peer_id(),
                                e
                            );
                        }
                    }
                }
                self.get_locally(key).await
            })
            .await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let req = FetchRequest::new(self.name.clone(), key);
        let resp = peer.fetch(&req).await?;
        Ok(ByteView::from(resp.value))
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        tracing::debug!("[{}] loading {} from source", self.name, key);
        match (self.loader)(key.to_string()).await {
            Ok(bytes) => {
                GroupStats::incr(&self.stats.local_loads);
                let view = ByteView::copy_from(&bytes);
                self.populate_cache(key, view.clone());
                Ok(view)
            }
            Err(e) => {
                GroupStats::incr(&self.stats.local_load_errors);
                Err(CacheError::source_failure(e))
            }
        }
    }

    fn populate_cache(&self, key: &str, value: ByteView) {
        self.main_cache.add(key, value);
    }
}

/// Fallible constructor for `Group`.
///
/// A cache budget is required: either `cache_bytes(n)` with `n > 0`, or an
/// explicit `unbounded_cache()` to turn eviction off.
pub struct GroupBuilder {
    name: String,
    cache_bytes: Option<u64>,
    unbounded: bool,
    loader: Option<LoaderFn>,
    peer_policy: PeerCachePolicy,
}

impl GroupBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_bytes: None,
            unbounded: false,
            loader: None,
            peer_policy: PeerCachePolicy::default(),
        }
    }

    pub fn cache_bytes(mut self, cache_bytes: u64) -> Self {
        self.cache_bytes = Some(cache_bytes);
        self
    }

    /// Disables eviction for this group's cache.
    pub fn unbounded_cache(mut self) -> Self {
        self.unbounded = true;
        self
    }

    pub fn loader<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
    {
        self.loader = Some(loader_fn(loader));
        self
    }

    pub fn loader_fn(mut self, loader: LoaderFn) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn peer_cache_policy(mut self, policy: PeerCachePolicy) -> Self {
        self.peer_policy = policy;
        self
    }

    pub fn build(self) -> Result<Group> {
        let Some(loader) = self.loader else {
            return Err(CacheError::Config(format!(
                "group {} has no loader",
                self.name
            )));
        };

        let stats = Arc::new(GroupStats::default());
        let lru = match (self.unbounded, self.cache_bytes.and_then(NonZeroU64::new)) {
            (true, _) => LruCache::unbounded(),
            (false, Some(max_bytes)) => LruCache::new(max_bytes),
            (false, None) => {
                return Err(CacheError::Config(format!(
                    "group {} needs cache_bytes > 0 or unbounded_cache()",
                    self.name
                )));
            }
        };
        let evictions = stats.clone();
        let lru = lru.with_eviction_hook(move |_key: &str, _value: &ByteView| {
            GroupStats::incr(&evictions.evictions);
        });

        Ok(Group {
            name: self.name,
            loader,
            main_cache: LocalCache::new(lru),
            peers: OnceLock::new(),
            flight: SingleFlight::new(),
            peer_policy: self.peer_policy,
            stats,
        })
    }
}

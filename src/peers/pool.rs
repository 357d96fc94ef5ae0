use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::client::HttpGetter;
use super::protocol::{DEFAULT_BASE_PATH, DEFAULT_REPLICAS, normalize_base_path};
use super::traits::{PeerGetter, PeerPicker};
use crate::error::{CacheError, Result};
use crate::ring::{HashFn, HashRing};

/// Tunables for an `HttpPool`.
///
/// Both timeouts default to `None`, meaning peer calls have no deadline of their
/// own and rely on the transport's defaults.
#[derive(Clone)]
pub struct PoolOptions {
    pub base_path: String,
    pub replicas: usize,
    pub hash: Option<HashFn>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            hash: None,
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("base_path", &self.base_path)
            .field("replicas", &self.replicas)
            .field("custom_hash", &self.hash.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

/// The HTTP peer set of one node: picks owners on a consistent-hash ring and
/// hands out an `HttpGetter` per remote peer.
///
/// `set` and `pick_peer` share one lock, so a lookup never observes a ring that
/// is halfway through being rebuilt.
pub struct HttpPool {
    self_url: String,
    options: PoolOptions,
    base_path: String,
    http_client: reqwest::Client,
    state: Mutex<PoolState>,
}

impl HttpPool {
    /// Pool for the node reachable at `self_url` (e.g. `http://10.0.0.1:8001`),
    /// with default options.
    pub fn new(self_url: impl Into<String>) -> Self {
        let options = PoolOptions::default();
        Self::build(self_url.into(), options, reqwest::Client::new())
    }

    /// Pool with explicit options. Fails if the HTTP client cannot be built.
    pub fn with_options(self_url: impl Into<String>, options: PoolOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| CacheError::Config(format!("building peer HTTP client: {}", e)))?;

        Ok(Self::build(self_url.into(), options, http_client))
    }

    fn build(self_url: String, options: PoolOptions, http_client: reqwest::Client) -> Self {
        let self_url = self_url.trim_end_matches('/').to_string();
        let base_path = normalize_base_path(&options.base_path);
        let ring = HashRing::new(options.replicas, options.hash.clone());
        Self {
            self_url,
            options,
            base_path,
            http_client,
            state: Mutex::new(PoolState {
                ring,
                getters: HashMap::new(),
            }),
        }
    }

    /// Replaces the peer set with exactly `peers`, rebuilding the ring and the
    /// getter table. The list normally includes this node itself.
    pub fn set<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers
            .into_iter()
            .map(|p| p.into().trim_end_matches('/').to_string())
            .collect();

        let mut ring = HashRing::new(self.options.replicas, self.options.hash.clone());
        ring.add(peers.iter().cloned());

        let getters = peers
            .iter()
            .map(|peer| {
                let getter = HttpGetter::new(
                    format!("{}{}", peer, self.base_path),
                    self.http_client.clone(),
                );
                (peer.clone(), Arc::new(getter))
            })
            .collect();

        {
            let mut state = self.state.lock();
            state.ring = ring;
            state.getters = getters;
        }

        tracing::info!("[server {}] peer set updated: {:?}", self.self_url, peers);
    }

    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Normalized path prefix this pool's peers are served under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Current peer list, sorted.
    pub fn peers(&self) -> Vec<String> {
        self.state.lock().ring.nodes().map(str::to_string).collect()
    }

    /// The ring owner of `key`, including this node itself.
    pub fn owner_of(&self, key: &str) -> Option<String> {
        self.state.lock().ring.get(key).map(str::to_string)
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let getter = {
            let state = self.state.lock();
            let peer = state.ring.get(key)?;
            if peer == self.self_url {
                return None;
            }
            state.getters.get(peer)?.clone()
        };
        tracing::debug!("[server {}] pick peer {}", self.self_url, getter.peer_id());
        Some(getter as Arc<dyn PeerGetter>)
    }
}

impl fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_url", &self.self_url)
            .field("base_path", &self.base_path)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Records whether any event was emitted while the pool state was locked.
    struct LockWatcher {
        pool: Arc<HttpPool>,
        logged_under_lock: Arc<AtomicBool>,
    }

    impl<S: tracing::Subscriber> Layer<S> for LockWatcher {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if self.pool.state.is_locked() {
                self.logged_under_lock.store(true, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_logging_happens_outside_the_state_lock() {
        let pool = Arc::new(HttpPool::new("http://127.0.0.1:8001"));
        let logged_under_lock = Arc::new(AtomicBool::new(false));
        let subscriber = tracing_subscriber::registry().with(LockWatcher {
            pool: pool.clone(),
            logged_under_lock: logged_under_lock.clone(),
        });

        tracing::subscriber::with_default(subscriber, || {
            pool.set(["http://127.0.0.1:8001", "http://127.0.0.1:8002"]);
            for i in 0..50 {
                let _ = pool.pick_peer(&format!("key-{}", i));
            }
        });

        assert!(!logged_under_lock.load(Ordering::SeqCst));
    }
}

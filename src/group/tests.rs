//! Cache Group Module Tests
//!
//! ## Test Scopes
//! - **Read path**: Validation, hits, loader invocation counts and error propagation.
//! - **Configuration**: Builder validation and one-shot peer registration.
//! - **Registry**: Lookup, replacement and the not-found sentinel.
//! - **Peers**: Owner fetch, fallback on peer failure and the peer caching policy,
//!   using an in-process transport in place of HTTP.

#[cfg(test)]
mod tests {
    use crate::error::{CacheError, Result};
    use crate::group::{Group, GroupRegistry, PeerCachePolicy};
    use crate::peers::{FetchRequest, FetchResponse, PeerGetter, PeerPicker};
    use crate::ring::HashRing;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn lookup(key: &str) -> anyhow::Result<Vec<u8>> {
        match key {
            "A" => Ok(b"1".to_vec()),
            "B" => Ok(b"2".to_vec()),
            "C" => Ok(b"3".to_vec()),
            _ => Err(anyhow::anyhow!("{} not exist", key)),
        }
    }

    fn db_group(name: &str, calls: Arc<AtomicUsize>, policy: PeerCachePolicy) -> Group {
        Group::builder(name)
            .cache_bytes(2 << 10)
            .peer_cache_policy(policy)
            .loader(move |key: String| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    lookup(&key)
                }
            })
            .build()
            .unwrap()
    }

    // ============================================================
    // IN-PROCESS TRANSPORT
    // ============================================================

    /// Fetches straight from another node's registry.
    struct RegistryGetter {
        id: String,
        registry: Arc<GroupRegistry>,
    }

    #[async_trait]
    impl PeerGetter for RegistryGetter {
        async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
            let group = self
                .registry
                .get_group(&req.group)
                .ok_or_else(|| CacheError::Status {
                    peer: self.id.clone(),
                    status: 404,
                })?;
            let view = group.get(&req.key).await?;
            Ok(FetchResponse {
                value: view.byte_slice(),
            })
        }

        fn peer_id(&self) -> &str {
            &self.id
        }
    }

    /// Always fails, as an unreachable peer would.
    struct DeadGetter;

    #[async_trait]
    impl PeerGetter for DeadGetter {
        async fn fetch(&self, _req: &FetchRequest) -> Result<FetchResponse> {
            Err(CacheError::Transport {
                peer: "dead".to_string(),
                message: "connection refused".to_string(),
            })
        }

        fn peer_id(&self) -> &str {
            "dead"
        }
    }

    struct RingPicker {
        self_id: String,
        ring: HashRing,
        getters: HashMap<String, Arc<dyn PeerGetter>>,
    }

    impl PeerPicker for RingPicker {
        fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
            let owner = self.ring.get(key)?;
            if owner == self.self_id {
                return None;
            }
            self.getters.get(owner).cloned()
        }
    }

    /// Always names the same peer as owner.
    struct FixedPicker(Arc<dyn PeerGetter>);

    impl PeerPicker for FixedPicker {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
            Some(self.0.clone())
        }
    }

    struct Cluster {
        ids: Vec<String>,
        registries: Vec<Arc<GroupRegistry>>,
        ring: HashRing,
        calls: Arc<AtomicUsize>,
    }

    impl Cluster {
        fn new(size: usize, policy: PeerCachePolicy) -> Self {
            let ids: Vec<String> = (1..=size).map(|i| format!("node-{}", i)).collect();
            let calls = Arc::new(AtomicUsize::new(0));
            let registries: Vec<Arc<GroupRegistry>> = ids
                .iter()
                .map(|_| {
                    let registry = GroupRegistry::new();
                    registry.insert(db_group("scores", calls.clone(), policy));
                    registry
                })
                .collect();

            let mut ring = HashRing::new(50, None);
            ring.add(ids.iter().cloned());

            for (id, registry) in ids.iter().zip(registries.iter()) {
                let getters = ids
                    .iter()
                    .zip(registries.iter())
                    .map(|(peer_id, peer_registry)| {
                        let getter: Arc<dyn PeerGetter> = Arc::new(RegistryGetter {
                            id: peer_id.clone(),
                            registry: peer_registry.clone(),
                        });
                        (peer_id.clone(), getter)
                    })
                    .collect();
                let mut node_ring = HashRing::new(50, None);
                node_ring.add(ids.iter().cloned());
                let picker = RingPicker {
                    self_id: id.clone(),
                    ring: node_ring,
                    getters,
                };
                registry
                    .get_group("scores")
                    .unwrap()
                    .register_peers(Arc::new(picker))
                    .unwrap();
            }

            Self {
                ids,
                registries,
                ring,
                calls,
            }
        }

        fn group(&self, idx: usize) -> Arc<Group> {
            self.registries[idx].get_group("scores").unwrap()
        }

        fn owner_index(&self, key: &str) -> usize {
            let owner = self.ring.get(key).unwrap();
            self.ids.iter().position(|id| id == owner).unwrap()
        }
    }

    // ============================================================
    // READ PATH TESTS
    // ============================================================

    #[tokio::test]
    async fn test_empty_key_is_invalid_argument() {
        let group = db_group("scores", Arc::new(AtomicUsize::new(0)), PeerCachePolicy::OwnerOnly);

        let result = group.get("").await;

        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_get_loads_once_then_hits_cache() {
        // ARRANGE
        let calls = Arc::new(AtomicUsize::new(0));
        let group = db_group("scores", calls.clone(), PeerCachePolicy::OwnerOnly);

        // ACT + ASSERT: every key loads once, the second read is a hit
        for (key, expected) in [("A", "1"), ("B", "2"), ("C", "3")] {
            let view = group.get(key).await.unwrap();
            assert_eq!(view.to_string(), expected);

            let again = group.get(key).await.unwrap();
            assert_eq!(again.to_string(), expected);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let stats = group.stats();
        assert_eq!(stats.gets, 6);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.local_loads, 3);
        assert_eq!(stats.cached_entries, 3);
    }

    #[tokio::test]
    async fn test_loader_error_is_returned_verbatim_and_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = db_group("scores", calls.clone(), PeerCachePolicy::OwnerOnly);

        let err = group.get("missing").await.unwrap_err();
        assert!(matches!(err, CacheError::Source(_)));
        assert_eq!(err.to_string(), "missing not exist");
        assert!(!group.is_cached("missing"));

        // A second read must hit the loader again.
        assert!(group.get("missing").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(group.stats().local_load_errors, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_load_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let group = Arc::new(
            Group::builder("slow")
                .cache_bytes(1024)
                .loader(move |key: String| {
                    let calls = counted.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok::<_, anyhow::Error>(format!("value-of-{}", key).into_bytes())
                    }
                })
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let group = group.clone();
                tokio::spawn(async move { group.get("hot").await })
            })
            .collect();

        for handle in handles {
            let view = handle.await.unwrap().unwrap();
            assert_eq!(view.to_string(), "value-of-hot");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_eviction_is_counted() {
        let group = Group::builder("tiny")
            .cache_bytes(8)
            .loader(|key: String| async move { Ok::<_, anyhow::Error>(vec![b'x'; key.len()]) })
            .build()
            .unwrap();

        group.get("aaa").await.unwrap(); // 6 bytes
        group.get("bbb").await.unwrap(); // 12 > 8, evicts "aaa"

        assert!(!group.is_cached("aaa"));
        assert!(group.is_cached("bbb"));
        assert_eq!(group.stats().evictions, 1);
        assert_eq!(group.cached_bytes(), 6);
    }

    // ============================================================
    // CONFIGURATION TESTS
    // ============================================================

    #[test]
    fn test_builder_requires_loader() {
        let result = Group::builder("no-loader").cache_bytes(1024).build();

        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_zero_budget_without_explicit_unbounded() {
        let zero = Group::builder("zero")
            .cache_bytes(0)
            .loader(|_key: String| async { Ok::<_, anyhow::Error>(Vec::new()) })
            .build();
        assert!(matches!(zero, Err(CacheError::Config(_))));

        let unbounded = Group::builder("unbounded")
            .unbounded_cache()
            .loader(|_key: String| async { Ok::<_, anyhow::Error>(Vec::new()) })
            .build();
        assert!(unbounded.is_ok());
    }

    #[test]
    fn test_register_peers_only_once() {
        let group = db_group("scores", Arc::new(AtomicUsize::new(0)), PeerCachePolicy::OwnerOnly);
        let picker: Arc<dyn PeerPicker> = Arc::new(FixedPicker(Arc::new(DeadGetter)));

        assert!(group.register_peers(picker.clone()).is_ok());
        assert!(group.has_peers());

        let second = group.register_peers(picker);
        assert!(matches!(second, Err(CacheError::Config(_))));
    }

    // ============================================================
    // REGISTRY TESTS
    // ============================================================

    #[test]
    fn test_registry_lookup_and_not_found() {
        let registry = GroupRegistry::new();
        registry
            .new_group("scores", 2 << 10, |_key: String| async { Ok::<_, anyhow::Error>(Vec::new()) })
            .unwrap();

        let found = registry.get_group("scores");
        assert_eq!(found.map(|g| g.name().to_string()), Some("scores".to_string()));
        assert!(registry.get_group("scores111").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_reregistration_replaces() {
        let registry = GroupRegistry::new();
        registry
            .new_group("g", 1024, |_key: String| async { Ok::<_, anyhow::Error>(b"old".to_vec()) })
            .unwrap();
        registry
            .new_group("g", 1024, |_key: String| async { Ok::<_, anyhow::Error>(b"new".to_vec()) })
            .unwrap();

        let group = registry.get_group("g").unwrap();
        assert_eq!(group.get("k").await.unwrap().to_string(), "new");
        assert_eq!(registry.names(), vec!["g".to_string()]);

        assert!(registry.remove_group("g").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_new_group_rejects_zero_budget() {
        let registry = GroupRegistry::new();

        let result = registry.new_group("g", 0, |_key: String| async { Ok::<_, anyhow::Error>(Vec::new()) });

        assert!(matches!(result, Err(CacheError::Config(_))));
        assert!(registry.get_group("g").is_none());
    }

    // ============================================================
    // PEER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_peer_failure_falls_back_to_loader() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = db_group("scores", calls.clone(), PeerCachePolicy::OwnerOnly);
        group
            .register_peers(Arc::new(FixedPicker(Arc::new(DeadGetter))))
            .unwrap();

        let view = group.get("A").await.unwrap();

        assert_eq!(view.to_string(), "1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(group.is_cached("A"));
        let stats = group.stats();
        assert_eq!(stats.peer_errors, 1);
        assert_eq!(stats.local_loads, 1);
    }

    #[tokio::test]
    async fn test_peer_failure_then_loader_failure_reports_loader_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = db_group("scores", calls.clone(), PeerCachePolicy::OwnerOnly);
        group
            .register_peers(Arc::new(FixedPicker(Arc::new(DeadGetter))))
            .unwrap();

        let err = group.get("nope").await.unwrap_err();

        assert_eq!(err.to_string(), "nope not exist");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cluster_only_owner_caches() {
        // ARRANGE
        let cluster = Cluster::new(3, PeerCachePolicy::OwnerOnly);
        let owner = cluster.owner_index("A");
        let other = (owner + 1) % 3;

        // ACT: read through a node that does not own the key
        let via_other = cluster.group(other).get("A").await.unwrap();
        let via_owner = cluster.group(owner).get("A").await.unwrap();

        // ASSERT
        assert_eq!(via_other.to_string(), "1");
        assert_eq!(via_other, via_owner);
        assert!(cluster.group(owner).is_cached("A"));
        assert!(!cluster.group(other).is_cached("A"));
        assert_eq!(cluster.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cluster.group(other).stats().peer_loads, 1);
    }

    #[tokio::test]
    async fn test_cluster_every_node_agrees() {
        let cluster = Cluster::new(3, PeerCachePolicy::OwnerOnly);

        for key in ["A", "B", "C"] {
            let expected = String::from_utf8(lookup(key).unwrap()).unwrap();
            for node in 0..3 {
                let view = cluster.group(node).get(key).await.unwrap();
                assert_eq!(view.to_string(), expected);
            }
            let owner = cluster.owner_index(key);
            for node in 0..3 {
                assert_eq!(cluster.group(node).is_cached(key), node == owner);
            }
        }
        assert_eq!(cluster.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_populate_policy_caches_peer_values() {
        let cluster = Cluster::new(3, PeerCachePolicy::Populate);
        let owner = cluster.owner_index("B");
        let other = (owner + 1) % 3;

        cluster.group(other).get("B").await.unwrap();
        cluster.group(other).get("B").await.unwrap();

        assert!(cluster.group(other).is_cached("B"));
        assert!(cluster.group(owner).is_cached("B"));
        assert_eq!(cluster.group(other).stats().peer_loads, 1);
        assert_eq!(cluster.group(other).stats().hits, 1);
        assert_eq!(
            cluster.group(other).peer_cache_policy(),
            PeerCachePolicy::Populate
        );
    }
}

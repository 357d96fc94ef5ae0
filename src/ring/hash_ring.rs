use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Maps raw bytes to a position on the ring.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Consistent-hash ring with `replicas` virtual positions per node.
///
/// Positions are kept in a `BTreeMap`, so they are always sorted and a lookup is a
/// range query for the first position at or after the key's hash, wrapping to the
/// smallest position when the hash is past the end.
///
/// Each position lists its claimants in arrival order; the first one owns it.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    positions: BTreeMap<u32, Vec<String>>,
    nodes: BTreeSet<String>,
}

impl HashRing {
    /// Creates an empty ring. `hash` defaults to CRC32 (IEEE).
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        Self {
            hash: hash.unwrap_or_else(crc32_hash),
            replicas,
            positions: BTreeMap::new(),
            nodes: BTreeSet::new(),
        }
    }

    /// Places `replicas` virtual positions for each node.
    ///
    /// A position that is already taken keeps its current owner; the newcomer
    /// queues behind it and takes over if the owner is removed.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in nodes {
            let node = node.into();
            if self.nodes.contains(&node) {
                continue;
            }
            for position in self.virtual_positions(&node) {
                let claimants = self.positions.entry(position).or_default();
                if !claimants.contains(&node) {
                    claimants.push(node.clone());
                }
            }
            self.nodes.insert(node);
        }
    }

    /// Drops a node's own virtual positions; every other arc keeps its owner.
    /// A position the node shared passes to the next claimant.
    pub fn remove(&mut self, node: &str) -> bool {
        if !self.nodes.remove(node) {
            return false;
        }
        for position in self.virtual_positions(node) {
            if let Some(claimants) = self.positions.get_mut(&position) {
                claimants.retain(|owner| owner != node);
                if claimants.is_empty() {
                    self.positions.remove(&position);
                }
            }
        }
        true
    }

    /// Returns the node owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        let hash = (self.hash)(key.as_bytes());
        self.positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
            .and_then(|(_, claimants)| claimants.first())
            .map(String::as_str)
    }

    /// Number of physical nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    fn virtual_positions(&self, node: &str) -> Vec<u32> {
        (0..self.replicas)
            .map(|i| (self.hash)(format!("{}{}", i, node).as_bytes()))
            .collect()
    }
}

fn crc32_hash() -> HashFn {
    Arc::new(crc32fast::hash)
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("nodes", &self.nodes)
            .field("positions", &self.positions.len())
            .finish()
    }
}

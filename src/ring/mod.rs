//! Consistent Hashing Module
//!
//! Decides which node owns a key. Each physical node is hashed onto a 32-bit
//! circle at `replicas` virtual positions; a key belongs to the first position
//! clockwise from its own hash.
//!
//! Adding or removing a node only moves the keys that fall on that node's own
//! arcs, which is what lets the peer set change without flushing every cache.

pub mod hash_ring;

pub use hash_ring::{HashFn, HashRing};

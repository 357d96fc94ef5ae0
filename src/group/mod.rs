//! Cache Group Module
//!
//! A `Group` is one cache namespace and the entry point for reads.
//!
//! ## Read Path
//! 1. **Local hit**: the value is served from this node's LRU cache.
//! 2. **Owner lookup**: on a miss, the peer picker names the key's owner. If it is
//!    another node, the value is fetched from it and returned (not cached here
//!    unless `PeerCachePolicy::Populate` is set).
//! 3. **Source of truth**: if this node owns the key, or the peer call fails, the
//!    group's loader runs once and the result is cached locally.
//!
//! Steps 2 and 3 run inside a single-flight call, so concurrent misses on a key
//! trigger one load.
//!
//! ## Submodules
//! - **`group`**: `Group` and its fallible `GroupBuilder`.
//! - **`registry`**: Name → group lookup shared with the HTTP layer.
//! - **`types`**: Loader type, peer caching policy and counters.

pub mod group;
pub mod registry;
pub mod types;

pub use group::{Group, GroupBuilder};
pub use registry::GroupRegistry;
pub use types::{GroupStatsSnapshot, LoaderFn, PeerCachePolicy, loader_fn};

#[cfg(test)]
mod tests;

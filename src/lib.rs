//! Distributed In-Process Cache Library
//!
//! Each node keeps a size-bounded LRU cache per namespace ("group"). Keys are
//! owned by exactly one node, chosen with a consistent-hash ring, and a miss is
//! routed to that owner over HTTP. Only the owner falls back to the group's
//! loader (the source of truth), and concurrent misses on one key are collapsed
//! into a single load.
//!
//! ## Modules
//! - **`cache`**: Immutable `ByteView` values, the byte-bounded `LruCache` and its
//!   thread-safe `LocalCache` wrapper.
//! - **`ring`**: Consistent hashing with virtual nodes.
//! - **`singleflight`**: Per-key request coalescing.
//! - **`group`**: The `Group` read path and the `GroupRegistry`.
//! - **`peers`**: Peer selection traits, the HTTP pool, client and handler.
//! - **`config`**: Node settings for the `cache-node` binary.
//! - **`error`**: The `CacheError` type shared by all of the above.

pub mod cache;
pub mod config;
pub mod error;
pub mod group;
pub mod peers;
pub mod ring;
pub mod singleflight;

pub use cache::ByteView;
pub use error::{CacheError, Result};
pub use group::{Group, GroupRegistry, PeerCachePolicy};
pub use peers::{HttpPool, PeerGetter, PeerPicker};

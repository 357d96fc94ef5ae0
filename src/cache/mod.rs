//! Local Cache Module
//!
//! Holds the node-local half of the system: values a node owns live here until
//! the byte budget forces them out.
//!
//! ## Core Concepts
//! - **ByteView**: Immutable snapshot of a value. Accessors hand out copies, never the cached buffer.
//! - **LruCache**: Byte-budgeted store. Accounts `len(key) + len(value)` per entry and evicts from the
//!   least recently used end once the budget is exceeded.
//! - **LocalCache**: The lock-guarded wrapper a `Group` owns, safe to share across request tasks.

pub mod byteview;
pub mod local;
pub mod lru;

pub use byteview::ByteView;
pub use local::LocalCache;
pub use lru::{CacheValue, EvictionHook, LruCache};

//! Peer Transport Module
//!
//! Lets a node find the owner of a key and fetch the value from it.
//!
//! ## Core Concepts
//! - **PeerPicker / PeerGetter**: Independent contracts for "who owns this key" and
//!   "fetch this key from that node". A `Group` only ever talks to these traits.
//! - **HttpPool**: Picker backed by a consistent-hash ring over the configured peer URLs.
//!   Never picks the local node.
//! - **HttpGetter**: Client for one peer, `GET {peer}{base}{group}/{key}`.
//! - **Handlers**: Axum handler answering those requests from the local groups.

pub mod client;
pub mod handlers;
pub mod pool;
pub mod protocol;
pub mod traits;

pub use client::HttpGetter;
pub use handlers::peer_router;
pub use pool::{HttpPool, PoolOptions};
pub use protocol::{FetchRequest, FetchResponse};
pub use traits::{PeerGetter, PeerPicker};

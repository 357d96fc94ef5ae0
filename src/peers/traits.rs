//! Capability contracts between a `Group` and the rest of the cluster.
//!
//! Picking an owner and fetching from it are separate traits so the placement
//! algorithm and the transport can be swapped independently.

use async_trait::async_trait;
use std::sync::Arc;

use super::protocol::{FetchRequest, FetchResponse};
use crate::error::Result;

/// Fetches a value from one specific remote node.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;

    /// Identifies the peer in logs.
    fn peer_id(&self) -> &str;
}

/// Chooses the node that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the owning peer, or `None` when the key belongs to this node
    /// (or no peers are configured).
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

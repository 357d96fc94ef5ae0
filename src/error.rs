//! Error taxonomy shared by the cache, the group layer and the peer transport.
//!
//! `CacheError` is `Clone` because a single failed load is handed to every caller
//! that was coalesced onto it. Loader errors are wrapped in an `Arc` so their
//! message reaches those callers unchanged.

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The caller supplied an unusable argument (e.g. an empty key).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The source-of-truth loader failed. Displays the loader's own message.
    #[error("{0}")]
    Source(Arc<anyhow::Error>),

    /// The peer could not be reached or the response body could not be read.
    #[error("peer {peer} transport error: {message}")]
    Transport { peer: String, message: String },

    /// The peer answered with something other than 200 OK.
    #[error("peer {peer} returned status {status}")]
    Status { peer: String, status: u16 },

    /// A peer request did not follow the `{group}/{key}` path layout.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Setup-time misuse: duplicate peer registration, missing loader, bad config.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CacheError {
    pub fn source_failure(err: anyhow::Error) -> Self {
        CacheError::Source(Arc::new(err))
    }

    /// True for failures that happened while talking to a peer.
    pub fn is_peer_failure(&self) -> bool {
        matches!(self, CacheError::Transport { .. } | CacheError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

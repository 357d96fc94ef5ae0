//! Peer Network Protocol
//!
//! Defines the path layout and the request/response objects exchanged between
//! nodes. A request travels as the URL path `{base}{group}/{key}` with both
//! segments percent-encoded; a response body is the raw value bytes.
//!
//! URL parsers collapse `.` and `..` path segments (percent-encoded or not), so
//! a segment made only of those dots is sent as `~.` / `~..`. A literal `~` is
//! always percent-encoded, which keeps the marker unambiguous.

use crate::error::{CacheError, Result};

// --- Defaults ---

/// Path prefix under which every node serves peer requests.
pub const DEFAULT_BASE_PATH: &str = "/_cachee/";
/// Virtual positions per node on the peer ring.
pub const DEFAULT_REPLICAS: usize = 50;
/// Content type of a successful peer response.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

// --- Data Transfer Objects ---

/// Asks a peer for the value of `key` in namespace `group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub group: String,
    pub key: String,
}

/// The value a peer returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub value: Vec<u8>,
}

impl FetchRequest {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }

    /// `{group}/{key}` with each segment percent-encoded, so a `/` inside the
    /// group name or key never splits the path.
    pub fn encoded_path(&self) -> String {
        format!(
            "{}/{}",
            encode_segment(&self.group),
            encode_segment(&self.key)
        )
    }

    /// Parses the part of a request path that follows the base path.
    ///
    /// The path is split once on `/`; both segments are percent-decoded.
    pub fn from_path(rest: &str) -> Result<Self> {
        let Some((group, key)) = rest.split_once('/') else {
            return Err(CacheError::Protocol(format!(
                "expected {{group}}/{{key}}, got {:?}",
                rest
            )));
        };
        if group.is_empty() {
            return Err(CacheError::Protocol("missing group name".to_string()));
        }

        Ok(Self {
            group: decode_segment(group)?,
            key: decode_segment(key)?,
        })
    }
}

const DOT_SEGMENT_MARKER: char = '~';

fn encode_segment(segment: &str) -> String {
    let encoded = urlencoding::encode(segment).replace(DOT_SEGMENT_MARKER, "%7E");
    if matches!(segment, "." | "..") {
        format!("{}{}", DOT_SEGMENT_MARKER, encoded)
    } else {
        encoded
    }
}

fn decode_segment(segment: &str) -> Result<String> {
    let segment = match segment.strip_prefix(DOT_SEGMENT_MARKER) {
        Some(dots @ ("." | "..")) => return Ok(dots.to_string()),
        Some(_) => {
            return Err(CacheError::Protocol(format!(
                "unexpected {:?} in path segment {:?}",
                DOT_SEGMENT_MARKER, segment
            )));
        }
        None => segment,
    };
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| CacheError::Protocol(format!("bad percent-encoding: {}", e)))
}

/// Normalizes a configured base path to the `/prefix/` form.
pub fn normalize_base_path(base_path: &str) -> String {
    let cleaned = base_path.trim_matches('/');
    if cleaned.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", cleaned)
    }
}

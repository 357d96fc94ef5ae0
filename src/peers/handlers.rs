use axum::{
    Extension, Router,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;

use super::protocol::{CONTENT_TYPE_OCTET_STREAM, FetchRequest, normalize_base_path};
use crate::error::CacheError;
use crate::group::registry::GroupRegistry;

/// Base path the peer routes are mounted under, shared with the handler.
#[derive(Debug, Clone)]
pub struct BasePath(pub String);

/// Router serving `GET {base_path}{group}/{key}` for every group in `registry`.
pub fn peer_router(registry: Arc<GroupRegistry>, base_path: &str) -> Router {
    let base = normalize_base_path(base_path);
    Router::new()
        .route(&base, get(handle_peer_get))
        .route(&format!("{}*rest", base), get(handle_peer_get))
        .layer(Extension(registry))
        .layer(Extension(BasePath(base)))
}

/// Serves a value to a peer.
///
/// - 400: path is not `{group}/{key}` or the key is empty
/// - 404: group is not registered on this node
/// - 500: the group's loader failed (body is the error text)
pub async fn handle_peer_get(
    Extension(registry): Extension<Arc<GroupRegistry>>,
    Extension(BasePath(base)): Extension<BasePath>,
    uri: Uri,
) -> Response {
    let path = uri.path();
    tracing::info!("[peer] GET {}", path);

    let rest = path.strip_prefix(base.as_str()).unwrap_or_default();
    let req = match FetchRequest::from_path(rest) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("Rejected peer request {}: {}", path, e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let Some(group) = registry.get_group(&req.group) else {
        return (
            StatusCode::NOT_FOUND,
            format!("no such group: {}", req.group),
        )
            .into_response();
    };

    match group.get(&req.key).await {
        Ok(view) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM)],
            view.byte_slice(),
        )
            .into_response(),
        Err(e @ CacheError::InvalidArgument(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to load {}/{}: {}", req.group, req.key, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

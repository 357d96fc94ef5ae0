use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, extract::Extension, routing::get};
use distributed_cache::config::NodeConfig;
use distributed_cache::error::CacheError;
use distributed_cache::group::{Group, GroupRegistry};
use distributed_cache::peers::{HttpPool, peer_router};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!(
            "Usage: {} [--config <file.json>] [--port <port>] [--api] [--peer <url>]... [--cache-bytes <n>] [--group <name>]",
            args[0]
        );
        eprintln!("Example: {} --port 8001 --api", args[0]);
        eprintln!(
            "Example: {} --port 8002 --peer http://127.0.0.1:8001 --peer http://127.0.0.1:8002",
            args[0]
        );
        std::process::exit(1);
    }

    let config = NodeConfig::from_args(&args)?;
    tracing::info!("Starting cache node on port {}", config.port);
    tracing::info!("Peers: {:?}", config.peers);

    // 1. Groups:
    let registry = GroupRegistry::new();
    let db = Arc::new(slow_db());
    let group = registry.new_group(
        config.group_name.clone(),
        config.cache_bytes,
        move |key: String| {
            let db = db.clone();
            async move {
                tracing::info!("[slow] search key {}", key);
                tokio::time::sleep(Duration::from_millis(100)).await;
                match db.get(&key) {
                    Some(value) => Ok(value.as_bytes().to_vec()),
                    None => anyhow::bail!("{} not exist", key),
                }
            }
        },
    )?;

    // 2. Peers:
    let pool = Arc::new(HttpPool::with_options(
        config.self_url(),
        config.pool_options(),
    )?);
    pool.set(config.peers.iter().cloned());
    group.register_peers(pool.clone())?;

    // 3. Client API (optional):
    if config.api {
        let api_addr: SocketAddr = config.api_addr.parse()?;
        let api = Router::new()
            .route("/api", get(handle_api_get))
            .route("/api/stats", get(handle_api_stats))
            .layer(Extension(group.clone()));

        let listener = tokio::net::TcpListener::bind(api_addr).await?;
        tracing::info!("API server listening on {}", api_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, api).await {
                tracing::error!("API server stopped: {}", e);
            }
        });
    }

    // 4. Peer server:
    let app = peer_router(registry, pool.base_path());
    let peer_addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Peer server listening on {}", peer_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(peer_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn slow_db() -> HashMap<String, String> {
    HashMap::from([
        ("A".to_string(), "1".to_string()),
        ("B".to_string(), "2".to_string()),
        ("C".to_string(), "3".to_string()),
    ])
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    key: String,
}

async fn handle_api_get(
    Extension(group): Extension<Arc<Group>>,
    Query(query): Query<ApiQuery>,
) -> Response {
    match group.get(&query.key).await {
        Ok(view) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            view.byte_slice(),
        )
            .into_response(),
        Err(e @ CacheError::InvalidArgument(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_api_stats(Extension(group): Extension<Arc<Group>>) -> impl IntoResponse {
    Json(group.stats())
}

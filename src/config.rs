//! Node Configuration
//!
//! Settings for a single cache node, built by the `cache-node` binary from an
//! optional JSON file and command-line flags (flags win). Every field has a
//! default, so `NodeConfig::default()` describes the first node of the local
//! three-node demo cluster.

use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::peers::PoolOptions;
use crate::peers::protocol::{DEFAULT_BASE_PATH, DEFAULT_REPLICAS};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Port the peer server listens on.
    pub port: u16,
    /// Also start the client-facing API server.
    pub api: bool,
    pub api_addr: String,
    pub group_name: String,
    pub cache_bytes: u64,
    /// Every node of the cluster, this one included.
    pub peers: Vec<String>,
    pub base_path: String,
    pub replicas: usize,
    /// Deadline for a single peer request. `None` leaves it to the transport.
    pub peer_timeout_ms: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 8001,
            api: false,
            api_addr: "127.0.0.1:9999".to_string(),
            group_name: "scores".to_string(),
            cache_bytes: 2 << 10,
            peers: vec![
                "http://127.0.0.1:8001".to_string(),
                "http://127.0.0.1:8002".to_string(),
                "http://127.0.0.1:8003".to_string(),
            ],
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            peer_timeout_ms: None,
        }
    }
}

impl NodeConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening config file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parses `--config`, `--port`, `--api`, `--peer` (repeatable),
    /// `--cache-bytes`, `--group` and `--peer-timeout-ms`. `args[0]` is the
    /// program name.
    ///
    /// `--config <file>` is loaded first and the other flags override it. Any
    /// `--peer` replaces the configured peer list. Unknown flags are skipped.
    pub fn from_args(args: &[String]) -> anyhow::Result<Self> {
        let mut config = match args.iter().position(|a| a == "--config") {
            Some(i) => Self::from_file(flag_value(args, i)?)?,
            None => Self::default(),
        };
        let mut peers: Vec<String> = vec![];

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    i += 2;
                }
                "--port" => {
                    config.port = flag_value(args, i)?
                        .parse()
                        .context("--port expects a port number")?;
                    i += 2;
                }
                "--api" => {
                    config.api = true;
                    i += 1;
                }
                "--peer" => {
                    peers.push(flag_value(args, i)?.to_string());
                    i += 2;
                }
                "--cache-bytes" => {
                    config.cache_bytes = flag_value(args, i)?
                        .parse()
                        .context("--cache-bytes expects a byte count")?;
                    i += 2;
                }
                "--group" => {
                    config.group_name = flag_value(args, i)?.to_string();
                    i += 2;
                }
                "--peer-timeout-ms" => {
                    config.peer_timeout_ms = Some(
                        flag_value(args, i)?
                            .parse()
                            .context("--peer-timeout-ms expects milliseconds")?,
                    );
                    i += 2;
                }
                _ => {
                    i += 1;
                }
            }
        }

        if !peers.is_empty() {
            config.peers = peers;
        }
        if config.cache_bytes == 0 {
            bail!("cache_bytes must be greater than zero");
        }
        Ok(config)
    }

    /// The URL peers use to reach this node.
    pub fn self_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn pool_options(&self) -> PoolOptions {
        let timeout = self.peer_timeout_ms.map(Duration::from_millis);
        PoolOptions {
            base_path: self.base_path.clone(),
            replicas: self.replicas,
            hash: None,
            connect_timeout: timeout,
            request_timeout: timeout,
        }
    }
}

fn flag_value(args: &[String], i: usize) -> anyhow::Result<&str> {
    match args.get(i + 1) {
        Some(value) => Ok(value.as_str()),
        None => bail!("{} requires a value", args[i]),
    }
}

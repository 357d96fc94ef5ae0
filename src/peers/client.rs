use async_trait::async_trait;

use super::protocol::{FetchRequest, FetchResponse};
use super::traits::PeerGetter;
use crate::error::{CacheError, Result};

/// HTTP client side of the peer protocol for a single remote node.
pub struct HttpGetter {
    /// Peer address plus base path, e.g. `http://10.0.0.2:8001/_cachee/`.
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpGetter {
    pub fn new(base_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, req: &FetchRequest) -> String {
        format!("{}{}", self.base_url, req.encoded_path())
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let url = self.url_for(req);
        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::Transport {
                peer: self.base_url.clone(),
                message: e.to_string(),
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(CacheError::Status {
                peer: self.base_url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Transport {
                peer: self.base_url.clone(),
                message: format!("reading response body: {}", e),
            })?;

        Ok(FetchResponse {
            value: body.to_vec(),
        })
    }

    fn peer_id(&self) -> &str {
        &self.base_url
    }
}

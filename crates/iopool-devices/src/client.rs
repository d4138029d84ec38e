//! iopool API client.
//!
//! Two read-only calls: the pool list (used by pairing and pool discovery)
//! and one pool's detail (used by every poll). The API key travels in the
//! `x-api-key` header and is passed per call, so one client serves every
//! device and every pairing session.

use crate::error::{PoolError, PoolResult};
use crate::reading::{pools_from_json, reading_from_json, PoolSummary, Reading};
use async_trait::async_trait;
use iopool_core::config::{endpoints, normalize_endpoint, polling};
use iopool_core::ApiKey;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Read access to pool telemetry.
#[async_trait]
pub trait PoolApi: Send + Sync {
    /// Every pool attached to the key, in API order.
    async fn list_pools(&self, api_key: &ApiKey) -> PoolResult<Vec<PoolSummary>>;

    /// Latest reading of one pool.
    async fn pool_detail(&self, api_key: &ApiKey, pool_id: &str) -> PoolResult<Reading>;
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::IOPOOL_API.to_string(),
            timeout: Duration::from_secs(polling::REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`PoolApi`] over the iopool REST API.
#[derive(Debug, Clone)]
pub struct IopoolClient {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl IopoolClient {
    pub fn new(config: ClientConfig) -> PoolResult<Self> {
        let endpoint = normalize_endpoint(&config.endpoint);
        let base = Url::parse(&endpoint)
            .map_err(|e| PoolError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if base.cannot_be_a_base() {
            return Err(PoolError::InvalidEndpoint(endpoint));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            base,
            timeout: config.timeout,
        })
    }

    /// Client for the public iopool API.
    pub fn public() -> PoolResult<Self> {
        Self::new(ClientConfig::default())
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn pools_url(&self) -> Url {
        self.url(&[endpoints::POOLS_PATH.trim_start_matches('/')])
    }

    pub fn pool_url(&self, pool_id: &str) -> Url {
        self.url(&["pool", pool_id])
    }

    /// GET a JSON document. `pool_id` names the pool a 404 refers to.
    async fn get_json(&self, url: Url, api_key: &ApiKey, pool_id: Option<&str>) -> PoolResult<Value> {
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(endpoints::API_KEY_HEADER, &**api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PoolError::Network(format!("request timed out after {:?}", self.timeout))
                } else {
                    PoolError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(polling::LOGGED_BODY_CHARS).collect();
            debug!(url = %url, status = status.as_u16(), body = %body, "API request failed");

            return Err(match (status, pool_id) {
                (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
                    PoolError::Unauthorized(status.as_u16())
                }
                (StatusCode::NOT_FOUND, Some(id)) => PoolError::NotFound(id.to_string()),
                _ => PoolError::Http(status.as_u16()),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| PoolError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PoolApi for IopoolClient {
    async fn list_pools(&self, api_key: &ApiKey) -> PoolResult<Vec<PoolSummary>> {
        let body = self.get_json(self.pools_url(), api_key, None).await?;
        pools_from_json(&body)
    }

    async fn pool_detail(&self, api_key: &ApiKey, pool_id: &str) -> PoolResult<Reading> {
        let body = self
            .get_json(self.pool_url(pool_id), api_key, Some(pool_id))
            .await?;
        reading_from_json(&body)
    }
}

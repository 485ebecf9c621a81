//! NTS API client

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::models::{LiveBroadcastsResponse, MixtapesResponse};

/// Failure of a single API request. Not retried here; the caller owns the
/// polling schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait NtsApi: Send + Sync {
    /// `GET /live` — the live channels and what they are airing.
    async fn live(&self) -> Result<LiveBroadcastsResponse, ApiError>;
    /// `GET /mixtapes` — the infinite mixtapes.
    async fn mixtapes(&self) -> Result<MixtapesResponse, ApiError>;
}

pub struct LiveApi {
    client: reqwest::Client,
    base_url: String,
}

impl LiveApi {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("marconio/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url_for(path);
        debug!("api: GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Network(format!(
                "{} returned status: {}",
                url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode(&body)
    }
}

/// Decode an API body, mapping serde failures to [`ApiError::Decode`].
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl NtsApi for LiveApi {
    async fn live(&self) -> Result<LiveBroadcastsResponse, ApiError> {
        self.get("live").await
    }

    async fn mixtapes(&self) -> Result<MixtapesResponse, ApiError> {
        self.get("mixtapes").await
    }
}

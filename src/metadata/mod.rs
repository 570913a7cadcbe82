use crate::config::MetadataConfig;
use crate::error::FetchError;
use crate::types::TokenMetadataDocument;
use crate::utils::retry::{retry, RetryPolicy};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Marker locating the content hash inside a token uri.
pub const GATEWAY_MARKER: &str = "ipfs.io/ipfs/";

/// Resolves a token uri to its metadata document.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<TokenMetadataDocument, FetchError>;
}

pub struct MetadataFetcher {
    client: reqwest::Client,
    gateway_url: String,
    retry_policy: RetryPolicy,
}

impl MetadataFetcher {
    pub fn new(config: &MetadataConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Rewrites `uri` onto the configured gateway.
    ///
    /// Everything after the first `ipfs.io/ipfs/` is appended to the gateway
    /// prefix. A uri without the marker, or with nothing after it, is rejected.
    pub fn gateway_url(&self, uri: &str) -> Result<String, FetchError> {
        let suffix = uri
            .find(GATEWAY_MARKER)
            .map(|pos| &uri[pos + GATEWAY_MARKER.len()..])
            .filter(|suffix| !suffix.is_empty())
            .ok_or_else(|| FetchError::MissingGatewayMarker(uri.to_string()))?;

        let base = self.gateway_url.trim_end_matches('/');
        Ok(format!("{}/{}", base, suffix))
    }

    async fn fetch_once(&self, url: &str) -> Result<TokenMetadataDocument, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetadataSource for MetadataFetcher {
    async fn fetch(&self, uri: &str) -> Result<TokenMetadataDocument, FetchError> {
        let url = self.gateway_url(uri)?;
        debug!("🔗 Fetching metadata from {}", url);

        retry(&self.retry_policy, || self.fetch_once(&url)).await
    }
}

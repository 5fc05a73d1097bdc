//! Access token sources
//!
//! Drive calls carry a bearer token from one of two sources:
//!
//! - [`StaticToken`]: a token supplied through configuration, used as is
//! - [`MetadataTokenSource`]: the service account attached to the compute
//!   instance, read from the metadata server and cached until shortly
//!   before it expires

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::DriveError;

/// Header the metadata server requires on every request
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";

/// Cached tokens are refreshed this long before their reported expiry
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on a metadata server round trip
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies bearer tokens for Drive requests
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token valid for at least the next request
    async fn access_token(&self) -> Result<String, DriveError>;
}

/// A fixed token from configuration
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, DriveError> {
        if self.0.is_empty() {
            return Err(DriveError::TokenUnavailable("static token is empty".into()));
        }
        Ok(self.0.clone())
    }
}

/// Token response of the metadata server
#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    /// Lifetime in seconds
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Service-account tokens from the compute metadata server
pub struct MetadataTokenSource {
    client: reqwest::Client,
    url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl MetadataTokenSource {
    /// Creates a source reading tokens from `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<MetadataTokenResponse, DriveError> {
        let response = self
            .client
            .get(&self.url)
            .header(METADATA_FLAVOR_HEADER, "Google")
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenUnavailable(format!(
                "metadata server returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        response
            .json::<MetadataTokenResponse>()
            .await
            .map_err(|e| DriveError::InvalidResponse(format!("metadata token response: {e}")))
    }
}

#[async_trait::async_trait]
impl TokenProvider for MetadataTokenSource {
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(REFRESH_MARGIN);
        debug!(expires_in = fresh.expires_in, "Fetched access token from metadata server");

        *cached = Some(CachedToken {
            value: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }
}

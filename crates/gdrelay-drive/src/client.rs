//! Google Drive API client
//!
//! Typed HTTP client for the Drive v3 REST API. Adds the bearer token from a
//! [`TokenProvider`] to every request and turns failure statuses into
//! [`RelayError::Upstream`] errors carrying the start of the response body.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gdrelay_drive::client::DriveClient;
//! use gdrelay_drive::changes;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::with_static_token("ya29.token");
//! let start = changes::get_start_page_token(&client).await?;
//! println!("changes start at {start}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use gdrelay_core::domain::RelayError;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::{StaticToken, TokenProvider};

/// Base URL for the Drive v3 API
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Service name used in upstream errors
pub(crate) const SERVICE: &str = "drive";

/// HTTP client for Google Drive API calls
#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl DriveClient {
    /// Creates a client against `base_url` using `tokens` for authentication
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Creates a client for the public Drive API with a fixed token
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self::new(DRIVE_BASE_URL, Arc::new(StaticToken::new(token)))
    }

    /// Creates a client with a fixed token and a custom base URL (useful for testing)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new(base_url, Arc::new(StaticToken::new(token)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that a token can be obtained right now
    pub async fn verify_credentials(&self) -> Result<(), crate::DriveError> {
        self.tokens.access_token().await.map(|_| ())
    }

    /// Creates an authenticated request builder for `path` relative to the base URL
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .access_token()
            .await
            .context("Failed to obtain Drive access token")?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    /// Sends `request`, mapping any non-success status to [`RelayError::Upstream`]
    pub async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {what} request"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), what, "Drive request failed");
        Err(anyhow::Error::new(RelayError::upstream(
            SERVICE,
            status.as_u16(),
            &body,
        ))
        .context(format!("{what} failed")))
    }

    /// Sends `request` and decodes a JSON body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T> {
        self.send(request, what)
            .await?
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {what} response"))
    }

    /// Sends `request` and returns the raw body
    pub async fn send_bytes(&self, request: RequestBuilder, what: &str) -> Result<Vec<u8>> {
        let bytes = self
            .send(request, what)
            .await?
            .bytes()
            .await
            .with_context(|| format!("Failed to read {what} response body"))?;
        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

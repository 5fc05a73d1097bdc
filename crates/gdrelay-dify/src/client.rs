//! Dify dataset API client
//!
//! Holds the endpoint, credentials and timeout for the dataset API. Missing
//! credentials are not an error at construction; they are reported as
//! [`RelayError::Configuration`] when an upload is attempted.

use std::time::Duration;

use gdrelay_core::config::IngestionConfig;
use gdrelay_core::domain::RelayError;
use reqwest::{Client, RequestBuilder};

/// Dataset API settings
#[derive(Clone)]
pub struct DifySettings {
    /// Base URL without the `/v1` suffix
    pub api_base: String,
    pub dataset_id: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// Sent on the enriched retry after a 400
    pub indexing_technique: String,
}

impl DifySettings {
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            dataset_id: config.dataset_id.clone().filter(|v| !v.is_empty()),
            api_key: config.api_key.clone().filter(|v| !v.is_empty()),
            timeout: Duration::from_secs(config.timeout_secs),
            indexing_technique: config.indexing_technique.clone(),
        }
    }
}

impl std::fmt::Debug for DifySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifySettings")
            .field("api_base", &self.api_base)
            .field("dataset_id", &self.dataset_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("indexing_technique", &self.indexing_technique)
            .finish()
    }
}

/// HTTP client for the Dify dataset API
#[derive(Debug, Clone)]
pub struct DifyClient {
    client: Client,
    settings: DifySettings,
}

impl DifyClient {
    pub fn new(settings: DifySettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &DifySettings {
        &self.settings
    }

    /// Builds an authenticated POST to `create-by-file` for the configured dataset
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Configuration`] if the dataset id or API key is missing.
    pub fn create_by_file(&self) -> Result<RequestBuilder, RelayError> {
        let dataset_id = self
            .settings
            .dataset_id
            .as_deref()
            .ok_or_else(|| RelayError::config("DIFY_DATASET_ID is not set"))?;
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::config("DIFY_API_KEY is not set"))?;

        let url = format!(
            "{}/v1/datasets/{}/document/create-by-file",
            self.settings.api_base, dataset_id
        );
        Ok(self
            .client
            .post(url)
            .bearer_auth(api_key)
            .timeout(self.settings.timeout))
    }
}

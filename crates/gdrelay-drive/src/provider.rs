//! GoogleDriveProvider - IDriveProvider implementation for Drive REST v3
//!
//! Delegates to the [`changes`], [`files`] and [`watch`] modules.
//!
//! ## Design Notes
//!
//! - Connection is two-phase: construction never touches the network; the
//!   first call builds the token source and checks that a token can be
//!   obtained. A failed check surfaces as [`RelayError::NotConnected`] and is
//!   retried on the next call.
//! - The connected [`DriveClient`] is kept in a `tokio::sync::OnceCell`, so
//!   concurrent first calls connect once.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use gdrelay_core::config::DriveConfig;
use gdrelay_core::domain::{
    FileId, FileSnapshot, PageToken, RelayError, WatchChannel, WatchRequest,
};
use gdrelay_core::ports::{ChangeBatch, IDriveProvider};

use crate::auth::{MetadataTokenSource, StaticToken, TokenProvider};
use crate::changes::{self, ListOptions};
use crate::client::DriveClient;
use crate::{files, watch};

/// Connection settings for [`GoogleDriveProvider`]
#[derive(Debug, Clone)]
pub struct DriveSettings {
    pub api_base: String,
    /// Static bearer token; the metadata server is used when absent
    pub access_token: Option<String>,
    pub metadata_token_url: String,
    pub list: ListOptions,
}

impl DriveSettings {
    pub fn from_config(config: &DriveConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            metadata_token_url: config.metadata_token_url.clone(),
            list: ListOptions {
                page_size: config.page_size,
                max_pages: config.max_pages_per_cycle,
            },
        }
    }
}

/// Drive provider that connects on first use
pub struct GoogleDriveProvider {
    settings: DriveSettings,
    client: OnceCell<DriveClient>,
}

impl GoogleDriveProvider {
    pub fn new(settings: DriveSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    /// Wraps an already connected client
    pub fn with_client(client: DriveClient, list: ListOptions) -> Self {
        let settings = DriveSettings {
            api_base: client.base_url().to_string(),
            access_token: None,
            metadata_token_url: String::new(),
            list,
        };
        Self {
            settings,
            client: OnceCell::from(client),
        }
    }

    /// Returns true once a connection has been established
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    /// Returns the connected client, connecting first if needed
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotConnected`] if no access token can be obtained.
    pub async fn client(&self) -> Result<&DriveClient, RelayError> {
        self.client.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<DriveClient, RelayError> {
        let (tokens, source): (Arc<dyn TokenProvider>, &str) = match &self.settings.access_token {
            Some(token) => (Arc::new(StaticToken::new(token.clone())), "static"),
            None => (
                Arc::new(MetadataTokenSource::new(
                    self.settings.metadata_token_url.clone(),
                )),
                "metadata",
            ),
        };

        debug!(source, "Connecting to Drive");
        let client = DriveClient::new(self.settings.api_base.clone(), tokens);
        client
            .verify_credentials()
            .await
            .map_err(|e| RelayError::NotConnected {
                service: "drive",
                reason: e.to_string(),
            })?;

        info!(source, api_base = %self.settings.api_base, "Connected to Drive");
        Ok(client)
    }
}

#[async_trait::async_trait]
impl IDriveProvider for GoogleDriveProvider {
    async fn get_start_page_token(&self) -> Result<PageToken> {
        changes::get_start_page_token(self.client().await?).await
    }

    async fn list_changes(&self, token: &PageToken) -> Result<ChangeBatch> {
        changes::list_changes(self.client().await?, token, self.settings.list).await
    }

    async fn get_file(&self, file_id: &FileId) -> Result<FileSnapshot> {
        files::get_file(self.client().await?, file_id).await
    }

    async fn export_file(&self, file_id: &FileId, mime_type: &str) -> Result<Vec<u8>> {
        files::export_file(self.client().await?, file_id, mime_type).await
    }

    async fn download_file(&self, file_id: &FileId) -> Result<Vec<u8>> {
        files::download_file(self.client().await?, file_id).await
    }

    async fn watch_changes(
        &self,
        token: &PageToken,
        request: &WatchRequest,
    ) -> Result<WatchChannel> {
        watch::watch_changes(self.client().await?, token, request).await
    }
}

//! Watch channel initialization use case
//!
//! Seeds the cursor with the provider's current start page token and then
//! registers a fresh push-notification channel. The token is persisted
//! before subscribing, so a notification arriving right after registration
//! always finds a cursor. Nothing is rolled back if the subscription fails:
//! the seeded cursor stays and a later initialization overwrites it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::CycleLock;
use crate::{
    domain::{
        watch::callback_address, ChannelId, RelayError, StatePatch, WatchInitialization,
        WatchRequest,
    },
    ports::{ICursorStore, IDriveProvider},
};

/// Establishes (or re-establishes) the push subscription
pub struct WatchChannelManager {
    drive: Arc<dyn IDriveProvider>,
    store: Arc<dyn ICursorStore>,
    lock: CycleLock,
    public_url: Option<String>,
    channel_token: String,
}

impl WatchChannelManager {
    /// Creates a manager
    ///
    /// # Arguments
    ///
    /// * `drive` - Provider the channel is registered with
    /// * `store` - Cursor store seeded with the start token
    /// * `lock` - Cycle lock shared with the change processor
    /// * `public_url` - Externally reachable `https://` base URL
    /// * `channel_token` - Shared secret Drive echoes on each notification
    pub fn new(
        drive: Arc<dyn IDriveProvider>,
        store: Arc<dyn ICursorStore>,
        lock: CycleLock,
        public_url: Option<String>,
        channel_token: impl Into<String>,
    ) -> Self {
        Self {
            drive,
            store,
            lock,
            public_url,
            channel_token: channel_token.into(),
        }
    }

    /// Seeds the cursor and registers a new watch channel
    ///
    /// Every call generates a new channel id. The previous channel is left to
    /// expire at the provider.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Configuration`] if the public URL is unset or not `https://`;
    ///   no remote call is made in that case
    /// - [`RelayError::Busy`] if another process keeps the cycle lease
    /// - the provider's or store's error for the first step that fails
    pub async fn initialize(&self) -> Result<WatchInitialization> {
        let base = self.callback_base()?;
        let guard = self.lock.acquire().await?;
        let result = self.register(base).await;
        guard.release().await;
        result
    }

    async fn register(&self, base: &str) -> Result<WatchInitialization> {
        let start_token = self
            .drive
            .get_start_page_token()
            .await
            .context("Failed to fetch start page token")?;

        self.store
            .merge(&StatePatch::page_token(start_token.clone()))
            .await
            .context("Failed to persist start page token")?;

        let request = WatchRequest {
            channel_id: ChannelId::new(),
            address: callback_address(base),
            token: self.channel_token.clone(),
        };
        let channel = self
            .drive
            .watch_changes(&start_token, &request)
            .await
            .with_context(|| format!("Failed to register watch channel {}", request.channel_id))?;

        // Channel details are diagnostic; the cursor is already in place
        if let Err(e) = self.store.merge(&StatePatch::channel(&channel)).await {
            warn!(channel_id = %channel.id, error = %e, "Failed to record watch channel");
        }

        info!(
            channel_id = %channel.id,
            resource_id = channel.resource_id.as_deref(),
            address = %request.address,
            start_token = %start_token,
            "Watch channel registered"
        );

        Ok(WatchInitialization {
            channel,
            start_token,
        })
    }

    fn callback_base(&self) -> Result<&str, RelayError> {
        let base = self
            .public_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| RelayError::config("WEBHOOK_URL is not set"))?;
        if !base.starts_with("https://") {
            return Err(RelayError::config(format!(
                "WEBHOOK_URL must start with https://, got '{base}'"
            )));
        }
        Ok(base)
    }
}

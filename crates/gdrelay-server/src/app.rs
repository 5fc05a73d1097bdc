//! Application wiring
//!
//! Builds the adapters from [`Config`] and assembles the use cases that the
//! HTTP routes and CLI commands share. The processor and the watch manager
//! hold the same [`CycleLock`], backed by a lease in the state database so
//! that `gdrelayd pull` and `gdrelayd init` wait for a running service's
//! cycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use gdrelay_core::config::Config;
use gdrelay_core::ports::{ICursorStore, IDriveProvider, IIngestionService};
use gdrelay_core::usecases::{
    ChangeProcessor, CycleLock, WatchChannelManager, WebhookAuthenticator,
};
use gdrelay_dify::{DifyIngestion, DifySettings};
use gdrelay_drive::{DriveSettings, GoogleDriveProvider};
use gdrelay_state::{DatabasePool, SqliteCursorStore, SqliteCycleLease};

/// Shared state behind every request and command
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ICursorStore>,
    pub processor: ChangeProcessor,
    pub watch: WatchChannelManager,
    pub authenticator: WebhookAuthenticator,
}

impl AppState {
    /// Opens the state database and constructs the remote adapters
    ///
    /// No remote call is made here; Drive connects on first use.
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = DatabasePool::new(&config.state.database)
            .await
            .context("Failed to open state database")?;
        let store: Arc<dyn ICursorStore> = Arc::new(SqliteCursorStore::new(pool.pool().clone()));
        let lease = SqliteCycleLease::new(pool.pool().clone());
        let lock = CycleLock::new().with_lease(Arc::new(lease));

        let drive: Arc<dyn IDriveProvider> = Arc::new(GoogleDriveProvider::new(
            DriveSettings::from_config(&config.drive),
        ));
        let ingestion: Arc<dyn IIngestionService> = Arc::new(DifyIngestion::new(
            DifySettings::from_config(&config.ingestion),
        ));

        info!(
            database = %config.state.database.display(),
            drive_api = %config.drive.api_base,
            dify_api = %config.ingestion.api_base,
            lease_holder = lock.holder(),
            "Application state ready"
        );
        Ok(Self::from_ports(config, drive, store, ingestion, lock))
    }

    /// Assembles the use cases over already constructed ports
    pub fn from_ports(
        config: Config,
        drive: Arc<dyn IDriveProvider>,
        store: Arc<dyn ICursorStore>,
        ingestion: Arc<dyn IIngestionService>,
        lock: CycleLock,
    ) -> Self {
        let processor = ChangeProcessor::new(
            Arc::clone(&drive),
            Arc::clone(&store),
            ingestion,
            lock.clone(),
        )
        .with_target_folder(config.target_folder().map(str::to_string));

        let watch = WatchChannelManager::new(
            drive,
            Arc::clone(&store),
            lock,
            config.webhook.public_url.clone(),
            config.webhook.channel_token.clone(),
        );

        let authenticator = WebhookAuthenticator::new(config.webhook.channel_token.clone());

        Self {
            config,
            store,
            processor,
            watch,
            authenticator,
        }
    }
}

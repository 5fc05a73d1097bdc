//! Serve command - Run the webhook service
//!
//! Binds the HTTP server and runs until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use gdrelay_core::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::AppState;
use crate::server::RelayServer;

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind, overriding `server.bind`
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: Config) -> Result<()> {
        let bind = self
            .bind
            .clone()
            .unwrap_or_else(|| config.server.bind.clone());

        let state = Arc::new(AppState::connect(config).await?);
        let server = RelayServer::new(state, &bind)?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal(signal_token).await;
        });

        let result = server.run(shutdown).await;
        match &result {
            Ok(()) => info!("gdrelayd shut down gracefully"),
            Err(e) => error!(error = %e, "gdrelayd exiting with error"),
        }
        result
    }
}

/// Cancels `token` on SIGINT or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

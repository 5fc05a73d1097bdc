//! Init command - Seed the page token and register a watch channel
//!
//! Same operation as `GET /init`, run from the operator's shell.

use anyhow::Result;
use clap::Args;
use gdrelay_core::config::Config;
use gdrelay_core::domain::WatchInitialization;

use crate::app::AppState;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct InitCommand {}

impl InitCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let state = AppState::connect(config).await?;
        let init = state.watch.initialize().await?;
        report(&init, format);
        Ok(())
    }
}

fn report(init: &WatchInitialization, format: OutputFormat) {
    let formatter = get_formatter(format);
    formatter.print_json(&serde_json::json!({
        "ok": true,
        "channel_id": init.channel.id.to_string(),
        "startPageToken": init.start_token.as_str(),
        "resource_id": init.channel.resource_id,
        "expiration": init.channel.expiration,
    }));

    formatter.success("Watch channel registered");
    formatter.field("Channel", Some(init.channel.id.to_string().as_str()));
    formatter.field("Start page token", Some(init.start_token.as_str()));
    formatter.field("Resource", init.channel.resource_id.as_deref());
    formatter.field(
        "Expires",
        init.channel
            .expiration
            .map(|e| e.to_rfc3339())
            .as_deref(),
    );
}

//! Status command - Show the stored relay state
//!
//! Reads the state database directly; no remote service is contacted.

use anyhow::{Context, Result};
use clap::Args;
use gdrelay_core::config::Config;
use gdrelay_core::domain::RelayState;
use gdrelay_core::ports::ICursorStore;
use gdrelay_state::{DatabasePool, SqliteCursorStore};

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if !config.state.database.exists() {
            formatter.warn(&format!(
                "No state database at {}. Run 'gdrelayd init' first.",
                config.state.database.display()
            ));
            return Ok(());
        }

        let pool = DatabasePool::new(&config.state.database)
            .await
            .context("Failed to open state database")?;
        let store = SqliteCursorStore::new(pool.pool().clone());
        let state = store.read().await.context("Failed to read relay state")?;

        formatter.print_json(&status_json(&config, &state));

        formatter.field("Page token", state.page_token.as_ref().map(|t| t.as_str()));
        formatter.field("Channel", state.channel_id.as_deref());
        formatter.field(
            "Channel expires",
            state.channel_expiration.map(|e| e.to_rfc3339()).as_deref(),
        );
        formatter.field(
            "Updated",
            state.updated_at.map(|u| u.to_rfc3339()).as_deref(),
        );
        formatter.field("Target folder", config.target_folder());

        for warning in config.warnings() {
            formatter.warn(&warning);
        }
        Ok(())
    }
}

fn status_json(config: &Config, state: &RelayState) -> serde_json::Value {
    serde_json::json!({
        "database": config.state.database.display().to_string(),
        "state": state,
        "target_folder_id": config.target_folder(),
        "warnings": config.warnings(),
    })
}

//! Pull command - Run one processing cycle now
//!
//! The cycle starts at the stored page token, exactly like a webhook
//! delivery, and waits for a cycle running in the service to finish first.

use anyhow::Result;
use clap::Args;
use gdrelay_core::config::Config;
use gdrelay_core::domain::CycleSummary;

use crate::app::AppState;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct PullCommand {}

impl PullCommand {
    pub async fn execute(&self, config: Config, format: OutputFormat) -> Result<()> {
        let state = AppState::connect(config).await?;
        let summary = state.processor.process_pending().await?;

        report(&summary, format);
        Ok(())
    }
}
fn report(summary: &CycleSummary, format: OutputFormat) {
    let formatter = get_formatter(format);
    if let Ok(value) = serde_json::to_value(summary) {
        formatter.print_json(&value);
    }

    formatter.success(&format!(
        "Cycle complete: {} uploaded, {} skipped of {} changes",
        summary.uploaded,
        summary.skipped.total(),
        summary.records_seen
    ));
    formatter.field("Started from", Some(summary.start_token.as_str()));
    formatter.field(
        "Committed",
        summary.committed_token.as_ref().map(|t| t.as_str()),
    );
}

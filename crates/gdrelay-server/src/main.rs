//! gdrelayd - Drive change relay service
//!
//! Receives Google Drive push notifications and relays changed files to a
//! Dify knowledge base. The same binary carries the operator commands:
//!
//! - `serve`  - run the webhook and operator HTTP endpoints
//! - `init`   - seed the page token and register a watch channel
//! - `pull`   - run one processing cycle from the shell
//! - `status` - show the stored page token and channel

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use gdrelay_core::config::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;
mod routes;
mod server;
#[cfg(test)]
mod testing;

use commands::{
    init::InitCommand, pull::PullCommand, serve::ServeCommand, status::StatusCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "gdrelayd", version, about = "Google Drive to Dify change relay")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the webhook service
    Serve(ServeCommand),
    /// Seed the page token and register a watch channel
    Init(InitCommand),
    /// Run one processing cycle now
    Pull(PullCommand),
    /// Show the stored relay state
    Status(StatusCommand),
}

/// Loads the file configuration, then applies environment overrides
///
/// An explicit `--config` path must exist; the default path may be absent.
fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()),
    };
    config.apply_env();

    let errors = config.validate();
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        bail!("Invalid configuration: {joined}");
    }
    Ok(config)
}

fn init_tracing(config: &Config, verbose: u8) {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config, cli.verbose);

    info!(version = env!("CARGO_PKG_VERSION"), "gdrelayd starting");
    for warning in config.warnings() {
        warn!("{warning}");
    }

    let format = OutputFormat::from_flag(cli.json);
    match cli.command {
        Commands::Serve(cmd) => cmd.execute(config).await,
        Commands::Init(cmd) => cmd.execute(config, format).await,
        Commands::Pull(cmd) => cmd.execute(config, format).await,
        Commands::Status(cmd) => cmd.execute(config, format).await,
    }
}

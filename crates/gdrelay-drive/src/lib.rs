//! gdrelay Drive - Google Drive REST v3 adapter
//!
//! Provides an async client for:
//! - Bearer tokens from a static value or the compute metadata server
//! - The changes feed, across shared drives, with pagination
//! - File metadata, export of native documents and raw downloads
//! - Push-notification channels on the changes feed
//!
//! ## Modules
//!
//! - [`auth`] - Access token sources
//! - [`client`] - Authenticated HTTP client
//! - [`changes`] - Change enumeration and start page tokens
//! - [`files`] - Metadata, export and download
//! - [`watch`] - Watch channel registration
//! - [`provider`] - `IDriveProvider` implementation with lazy connection

pub mod auth;
pub mod changes;
pub mod client;
pub mod files;
pub mod provider;
pub mod watch;

pub use provider::{DriveSettings, GoogleDriveProvider};

use thiserror::Error;

/// Errors raised while obtaining credentials or talking to Drive
#[derive(Debug, Error)]
pub enum DriveError {
    /// No access token could be obtained
    #[error("Token unavailable: {0}")]
    TokenUnavailable(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Drive answered with a body this client cannot interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

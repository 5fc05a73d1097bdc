//! Watch channel types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ChannelId, PageToken};

/// Path appended to the public base URL for notification delivery
pub const WEBHOOK_PATH: &str = "/drive-webhook";

/// Subscription request sent to the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    pub channel_id: ChannelId,
    /// Full callback address, including [`WEBHOOK_PATH`]
    pub address: String,
    /// Shared secret echoed back on every notification
    pub token: String,
}

/// A registered push-notification channel
///
/// The expiration is managed by the provider; it is reported but never
/// enforced locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchChannel {
    pub id: ChannelId,
    pub resource_id: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

/// Result of a successful watch initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchInitialization {
    pub channel: WatchChannel,
    pub start_token: PageToken,
}

/// Builds the callback address from the configured public base URL
pub fn callback_address(public_url: &str) -> String {
    format!("{}{}", public_url.trim_end_matches('/'), WEBHOOK_PATH)
}

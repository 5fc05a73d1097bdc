//! Persisted relay state
//!
//! The relay keeps one document under a fixed key. Its field of interest is
//! the page token; the remaining fields describe the last registered watch
//! channel and exist for diagnostics only.
//!
//! Writes are merges: a [`StatePatch`] only overwrites the fields it carries,
//! everything else in the stored document (including fields this crate does
//! not know about) is preserved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::PageToken;
use super::watch::WatchChannel;

/// Collection holding the relay document
pub const STATE_COLLECTION: &str = "state";

/// Key of the relay document within [`STATE_COLLECTION`]
pub const STATE_DOCUMENT: &str = "drive";

/// Snapshot of the stored relay document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayState {
    /// Cursor: all changes before this token have been processed
    #[serde(default)]
    pub page_token: Option<PageToken>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_resource_id: Option<String>,
    #[serde(default)]
    pub channel_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update merged into the stored relay document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<PageToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_expiration: Option<DateTime<Utc>>,
}

impl StatePatch {
    /// A patch that only advances the cursor
    pub fn page_token(token: PageToken) -> Self {
        Self {
            page_token: Some(token),
            ..Self::default()
        }
    }

    /// A patch recording a freshly registered watch channel
    pub fn channel(channel: &WatchChannel) -> Self {
        Self {
            channel_id: Some(channel.id.to_string()),
            channel_resource_id: channel.resource_id.clone(),
            channel_expiration: channel.expiration,
            ..Self::default()
        }
    }

    /// Returns true if the patch carries no fields
    pub fn is_empty(&self) -> bool {
        self.page_token.is_none()
            && self.channel_id.is_none()
            && self.channel_resource_id.is_none()
            && self.channel_expiration.is_none()
    }

    /// Renders the patch as a JSON object of the fields to overwrite
    pub fn to_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

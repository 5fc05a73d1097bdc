//! Push-notification channels on the changes feed
//!
//! `POST /changes/watch` registers a web-hook channel. Drive then sends a
//! notification to the channel address, echoing the channel token, whenever
//! the feed moves past the given page token. Channels expire on Drive's
//! schedule; the expiration is reported back but not acted on here.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gdrelay_core::domain::{PageToken, WatchChannel, WatchRequest};

use crate::client::DriveClient;

const WATCH_PATH: &str = "/changes/watch";

/// Channel resource sent to `changes.watch`
#[derive(Debug, Serialize)]
struct ChannelBody<'a> {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    address: &'a str,
    token: &'a str,
}

/// Channel resource returned by `changes.watch`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResponse {
    resource_id: Option<String>,
    /// Milliseconds since the Unix epoch, as a decimal string
    expiration: Option<String>,
}

fn parse_expiration(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let millis = raw?.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Registers a channel for changes after `token`
pub async fn watch_changes(
    client: &DriveClient,
    token: &PageToken,
    request: &WatchRequest,
) -> Result<WatchChannel> {
    let body = ChannelBody {
        id: request.channel_id.to_string(),
        kind: "web_hook",
        address: &request.address,
        token: &request.token,
    };

    let http_request = client
        .request(Method::POST, WATCH_PATH)
        .await?
        .query(&[
            ("pageToken", token.as_str()),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ])
        .json(&body);

    let response: ChannelResponse = client.send_json(http_request, "changes.watch").await?;

    let channel = WatchChannel {
        id: request.channel_id,
        resource_id: response.resource_id,
        expiration: parse_expiration(response.expiration.as_deref()),
    };
    debug!(
        channel_id = %channel.id,
        resource_id = channel.resource_id.as_deref(),
        "Registered changes watch"
    );
    Ok(channel)
}

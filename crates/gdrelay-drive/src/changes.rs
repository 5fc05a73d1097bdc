//! Drive changes feed
//!
//! The changes feed is read from a page token. Each response page carries
//! either a `nextPageToken` (more pages follow) or a `newStartPageToken` (the
//! end of the feed; resume from it next time).
//!
//! ## Enumeration Flow
//!
//! 1. Request `GET /changes?pageToken=...` including items from all drives
//! 2. Follow `nextPageToken` pages, accumulating records in order
//! 3. Stop at `newStartPageToken`, or at the page cap, in which case the last
//!    `nextPageToken` becomes the resume point

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use gdrelay_core::{
    domain::{ChangeRecord, EmbeddedFile, FileId, PageToken},
    ports::ChangeBatch,
};

use crate::client::DriveClient;

const CHANGES_PATH: &str = "/changes";
const START_PAGE_TOKEN_PATH: &str = "/changes/startPageToken";

/// Limits applied to one enumeration
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Records requested per page
    pub page_size: u32,
    /// Pages followed before stopping early
    pub max_pages: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 20,
        }
    }
}

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// One page of `GET /changes`
///
/// See: <https://developers.google.com/drive/api/reference/rest/v3/changes/list>
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveChangeList {
    #[serde(default)]
    changes: Vec<DriveChange>,
    next_page_token: Option<String>,
    new_start_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveChange {
    file_id: Option<String>,
    #[serde(default)]
    removed: bool,
    file: Option<DriveChangeFile>,
}

/// File resource embedded in a change; may be stale or partial
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveChangeFile {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPageTokenResponse {
    start_page_token: Option<String>,
}

// ============================================================================
// ChangeParser - converts Drive responses to domain records
// ============================================================================

/// Converts raw change pages into [`ChangeRecord`]s
pub struct ChangeParser;

impl ChangeParser {
    fn parse_change(change: DriveChange) -> ChangeRecord {
        let file_id = change
            .file_id
            .and_then(|raw| match FileId::new(raw.clone()) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(file_id = %raw, error = %e, "Ignoring malformed file id in change");
                    None
                }
            });

        ChangeRecord {
            file_id,
            removed: change.removed,
            file: change.file.map(|f| EmbeddedFile {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type,
            }),
        }
    }

    fn parse_token(raw: Option<String>) -> Option<PageToken> {
        raw.and_then(|t| PageToken::new(t).ok())
    }
}

// ============================================================================
// Change feed functions
// ============================================================================

/// Fetches the token marking the current end of the changes feed
pub async fn get_start_page_token(client: &DriveClient) -> Result<PageToken> {
    let request = client
        .request(Method::GET, START_PAGE_TOKEN_PATH)
        .await?
        .query(&[("supportsAllDrives", "true")]);

    let response: StartPageTokenResponse = client
        .send_json(request, "changes.getStartPageToken")
        .await?;

    let token = ChangeParser::parse_token(response.start_page_token)
        .context("changes.getStartPageToken returned no token")?;
    debug!(start_token = %token, "Fetched start page token");
    Ok(token)
}

/// Lists every change since `token`, following continuation pages
///
/// # Returns
///
/// All records in provider order, with `next_token` set to:
/// - the `newStartPageToken` of the final page, or
/// - the last `nextPageToken` when `options.max_pages` was reached, or
/// - `None` when the final page carried neither token
pub async fn list_changes(
    client: &DriveClient,
    token: &PageToken,
    options: ListOptions,
) -> Result<ChangeBatch> {
    let mut records = Vec::new();
    let mut page_token = token.as_str().to_string();
    let mut page_count: u32 = 0;

    let next_token = loop {
        page_count += 1;
        let page = get_changes_page(client, &page_token, options.page_size).await?;
        debug!(
            page = page_count,
            changes = page.changes.len(),
            has_next = page.next_page_token.is_some(),
            "Received changes page"
        );
        records.extend(page.changes.into_iter().map(ChangeParser::parse_change));

        if let Some(new_start) = ChangeParser::parse_token(page.new_start_page_token) {
            break Some(new_start);
        }
        match ChangeParser::parse_token(page.next_page_token) {
            Some(next) if page_count >= options.max_pages => {
                warn!(
                    pages = page_count,
                    "Page cap reached; remaining changes deferred to the next cycle"
                );
                break Some(next);
            }
            Some(next) => page_token = next.as_str().to_string(),
            None => {
                warn!("Changes feed ended without a new start page token");
                break None;
            }
        }
    };

    debug!(
        total_changes = records.len(),
        total_pages = page_count,
        has_next_token = next_token.is_some(),
        "Change enumeration complete"
    );

    Ok(ChangeBatch {
        records,
        next_token,
    })
}

async fn get_changes_page(
    client: &DriveClient,
    page_token: &str,
    page_size: u32,
) -> Result<DriveChangeList> {
    let page_size = page_size.to_string();
    let request = client
        .request(Method::GET, CHANGES_PATH)
        .await?
        .query(&[
            ("pageToken", page_token),
            ("includeItemsFromAllDrives", "true"),
            ("supportsAllDrives", "true"),
            ("pageSize", page_size.as_str()),
        ]);

    client.send_json(request, "changes.list").await
}

// ============================================================================
// Tests
// ============================================================================

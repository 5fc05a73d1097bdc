//! File metadata and content retrieval
//!
//! - `GET /files/{id}` for a fresh metadata snapshot
//! - `GET /files/{id}/export` for native Google documents
//! - `GET /files/{id}?alt=media` for everything else
//!
//! All calls pass `supportsAllDrives=true` so files in shared drives resolve.

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use gdrelay_core::domain::{FileId, FileSnapshot};

use crate::client::DriveClient;

/// Fields requested for metadata snapshots
const SNAPSHOT_FIELDS: &str = "id,name,mimeType,trashed,parents";

/// Minimal File resource for metadata queries
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileResource {
    id: Option<String>,
    name: Option<String>,
    mime_type: Option<String>,
    #[serde(default)]
    trashed: bool,
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveFileResource {
    /// Converts to a snapshot, keeping `requested` if Drive omitted the id
    fn into_snapshot(self, requested: &FileId) -> Result<FileSnapshot> {
        let id = match self.id {
            Some(raw) => FileId::new(raw).context("Drive returned a malformed file id")?,
            None => requested.clone(),
        };
        Ok(FileSnapshot {
            id,
            name: self.name,
            mime_type: self.mime_type,
            trashed: self.trashed,
            parents: self.parents,
        })
    }
}

fn file_path(file_id: &FileId) -> String {
    format!("/files/{}", file_id.as_str())
}

/// Reads name, type, trashed flag and parents of `file_id`
pub async fn get_file(client: &DriveClient, file_id: &FileId) -> Result<FileSnapshot> {
    let request = client
        .request(Method::GET, &file_path(file_id))
        .await?
        .query(&[("fields", SNAPSHOT_FIELDS), ("supportsAllDrives", "true")]);

    let resource: DriveFileResource = client.send_json(request, "files.get").await?;
    let snapshot = resource.into_snapshot(file_id)?;

    debug!(
        file_id = %snapshot.id,
        mime_type = snapshot.mime_type.as_deref(),
        trashed = snapshot.trashed,
        parents = snapshot.parents.len(),
        "Fetched file metadata"
    );
    Ok(snapshot)
}

/// Exports a native Google document as `mime_type`
pub async fn export_file(client: &DriveClient, file_id: &FileId, mime_type: &str) -> Result<Vec<u8>> {
    let path = format!("{}/export", file_path(file_id));
    let request = client
        .request(Method::GET, &path)
        .await?
        .query(&[("mimeType", mime_type)]);

    let bytes = client.send_bytes(request, "files.export").await?;
    debug!(file_id = %file_id, mime_type, bytes = bytes.len(), "Exported file");
    Ok(bytes)
}

/// Downloads the stored content of `file_id`
pub async fn download_file(client: &DriveClient, file_id: &FileId) -> Result<Vec<u8>> {
    let request = client
        .request(Method::GET, &file_path(file_id))
        .await?
        .query(&[("alt", "media"), ("supportsAllDrives", "true")]);

    let bytes = client.send_bytes(request, "files.get media").await?;
    debug!(file_id = %file_id, bytes = bytes.len(), "Downloaded file");
    Ok(bytes)
}

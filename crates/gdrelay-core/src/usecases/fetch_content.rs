//! Content fetch use case
//!
//! Turns a Drive file into an [`UploadArtifact`]. Native Google documents are
//! exported to a portable format chosen by [`ExportFormat`]; any other file is
//! downloaded as stored.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    domain::{ExportFormat, FileId, UploadArtifact},
    ports::IDriveProvider,
};

/// Retrieves file content from the drive provider
pub struct ContentFetcher {
    drive: Arc<dyn IDriveProvider>,
}

impl ContentFetcher {
    pub fn new(drive: Arc<dyn IDriveProvider>) -> Self {
        Self { drive }
    }

    /// Fetches `file_id` and names the resulting artifact
    ///
    /// # Arguments
    ///
    /// * `file_id` - File to fetch
    /// * `mime_type` - Declared content type from the latest metadata read
    /// * `name_hint` - File name used for exported documents
    ///
    /// Exported files are named `<name_hint or id>.<ext>`. Downloaded files
    /// take the name Drive reports after the download, falling back to the
    /// file id when it reports none; `name_hint` is not used for them.
    ///
    /// # Errors
    ///
    /// Returns an error if the export, download or name lookup fails. There
    /// is no local retry.
    pub async fn fetch(
        &self,
        file_id: &FileId,
        mime_type: Option<&str>,
        name_hint: Option<&str>,
    ) -> Result<UploadArtifact> {
        if let Some(format) = mime_type.and_then(ExportFormat::for_mime_type) {
            debug!(file_id = %file_id, export_as = format.extension(), "Exporting native document");
            let bytes = self
                .drive
                .export_file(file_id, format.mime_type())
                .await
                .with_context(|| format!("Failed to export {file_id} as {}", format.extension()))?;
            return Ok(UploadArtifact {
                filename: format.filename(name_hint, file_id),
                bytes,
            });
        }

        debug!(file_id = %file_id, "Downloading file content");
        let bytes = self
            .drive
            .download_file(file_id)
            .await
            .with_context(|| format!("Failed to download {file_id}"))?;

        let filename = self
            .drive
            .get_file(file_id)
            .await
            .with_context(|| format!("Failed to look up name of {file_id}"))?
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| file_id.to_string());

        Ok(UploadArtifact { filename, bytes })
    }
}

//! Drive provider port (driven/secondary port)
//!
//! Interface to the cloud storage provider: change enumeration, metadata,
//! content retrieval and push-notification subscriptions.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   Adapters attach [`RelayError`](crate::domain::RelayError) variants where the
//!   caller must tell failures apart (e.g. `NotConnected`).
//! - [`ChangeBatch`] is a port-level DTO; the change processor is responsible
//!   for filtering it.

use crate::domain::{ChangeRecord, FileId, FileSnapshot, PageToken, WatchChannel, WatchRequest};

/// Result of enumerating the change feed from a page token
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    /// Change records in the order the provider returned them
    pub records: Vec<ChangeRecord>,
    /// Token to resume from next time
    ///
    /// `None` means the provider gave no new position and the stored
    /// token must be kept.
    pub next_token: Option<PageToken>,
}

/// Port trait for cloud storage provider operations
///
/// ## Implementation Notes
///
/// - Change enumeration must cover shared drives, not only the caller's files.
/// - Implementations do not retry; failures propagate to the use case.
#[async_trait::async_trait]
pub trait IDriveProvider: Send + Sync {
    /// Returns the token marking the current end of the change feed
    async fn get_start_page_token(&self) -> anyhow::Result<PageToken>;

    /// Lists all changes since `token`
    ///
    /// Continuation pages are followed before returning, so
    /// [`ChangeBatch::next_token`] is the position after the last record.
    async fn list_changes(&self, token: &PageToken) -> anyhow::Result<ChangeBatch>;

    /// Reads a file's current name, type, trashed flag and parents
    async fn get_file(&self, file_id: &FileId) -> anyhow::Result<FileSnapshot>;

    /// Exports a native document to `mime_type`
    async fn export_file(&self, file_id: &FileId, mime_type: &str) -> anyhow::Result<Vec<u8>>;

    /// Downloads a file's content verbatim
    async fn download_file(&self, file_id: &FileId) -> anyhow::Result<Vec<u8>>;

    /// Registers a push-notification channel for changes after `token`
    async fn watch_changes(
        &self,
        token: &PageToken,
        request: &WatchRequest,
    ) -> anyhow::Result<WatchChannel>;
}

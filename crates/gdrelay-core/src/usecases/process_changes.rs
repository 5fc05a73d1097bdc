//! Change processing use case
//!
//! One cycle enumerates the change feed from the stored page token, relays
//! every eligible file to the ingestion service, and only then commits the
//! next page token.
//!
//! ## Cursor rules
//!
//! - The cursor is written once per cycle, after every upload succeeded.
//! - Any failure leaves the stored cursor untouched, so the next trigger
//!   replays the whole batch. Uploads that already happened are not undone.
//! - When the provider reports no new position the stored cursor is kept.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{fetch_content::ContentFetcher, CycleLock};
use crate::{
    domain::{
        ChangeRecord, CycleState, CycleSummary, FileSnapshot, PageToken, RelayError, SkipCounts,
        SkipReason, StatePatch,
    },
    ports::{ICursorStore, IDriveProvider, IIngestionService},
};

/// Runs processing cycles against the drive, the ingestion service and the
/// cursor store
pub struct ChangeProcessor {
    drive: Arc<dyn IDriveProvider>,
    store: Arc<dyn ICursorStore>,
    ingestion: Arc<dyn IIngestionService>,
    fetcher: ContentFetcher,
    target_folder: Option<String>,
    lock: CycleLock,
    last_summary: Mutex<Option<CycleSummary>>,
}

impl ChangeProcessor {
    /// Creates a processor
    ///
    /// # Arguments
    ///
    /// * `drive` - Change feed, metadata and content source
    /// * `store` - Durable cursor store
    /// * `ingestion` - Upload target
    /// * `lock` - Cycle lock shared with the watch channel manager
    pub fn new(
        drive: Arc<dyn IDriveProvider>,
        store: Arc<dyn ICursorStore>,
        ingestion: Arc<dyn IIngestionService>,
        lock: CycleLock,
    ) -> Self {
        Self {
            fetcher: ContentFetcher::new(Arc::clone(&drive)),
            drive,
            store,
            ingestion,
            target_folder: None,
            lock,
            last_summary: Mutex::new(None),
        }
    }

    /// Restricts relaying to files whose parents contain `folder_id`
    ///
    /// `None` or an empty id disables the restriction.
    pub fn with_target_folder(mut self, folder_id: Option<String>) -> Self {
        self.target_folder = folder_id.filter(|f| !f.is_empty());
        self
    }

    /// Summary of the most recent cycle, successful or not
    pub fn last_summary(&self) -> Option<CycleSummary> {
        self.last_summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs one cycle from the stored page token
    ///
    /// # Errors
    ///
    /// - [`RelayError::Busy`] if another process keeps the cycle lease
    /// - [`RelayError::MissingCursor`] if no page token has been stored yet
    /// - the cursor store's error if it cannot be read
    /// - the first enumeration, fetch, upload or commit failure of the cycle
    pub async fn process_pending(&self) -> Result<CycleSummary> {
        let guard = self.lock.acquire().await?;
        let result = self.process_stored().await;
        guard.release().await;
        result
    }

    async fn process_stored(&self) -> Result<CycleSummary> {
        let state = self
            .store
            .read()
            .await
            .context("Failed to read relay state")?;
        let start = state.page_token.ok_or(RelayError::MissingCursor)?;

        self.run_cycle(&start).await
    }

    #[tracing::instrument(skip(self), fields(start = %start))]
    async fn run_cycle(&self, start: &PageToken) -> Result<CycleSummary> {
        let mut summary = CycleSummary::new(start.clone());
        let outcome = self.drive_cycle(start, &mut summary).await;
        summary.finished_at = Some(Utc::now());

        match &outcome {
            Ok(()) => info!(
                records = summary.records_seen,
                uploaded = summary.uploaded,
                skipped = summary.skipped.total(),
                committed = summary.committed_token.as_ref().map(|t| t.as_str()),
                duration_ms = summary.duration_ms(),
                "Processing cycle complete"
            ),
            Err(e) => {
                summary.state = CycleState::Failed;
                summary.error = Some(format!("{e:#}"));
                warn!(
                    uploaded = summary.uploaded,
                    error = %format!("{e:#}"),
                    "Processing cycle failed; page token not advanced"
                );
            }
        }

        *self
            .last_summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(summary.clone());

        outcome.map(|()| summary)
    }

    async fn drive_cycle(&self, start: &PageToken, summary: &mut CycleSummary) -> Result<()> {
        summary.state = summary.state.transition(CycleState::Enumerating)?;
        let batch = self
            .drive
            .list_changes(start)
            .await
            .context("Failed to enumerate changes")?;
        summary.records_seen = u32::try_from(batch.records.len()).unwrap_or(u32::MAX);
        debug!(records = batch.records.len(), "Enumerated changes");

        for record in &batch.records {
            let Some(file) = self.eligible_file(record, &mut summary.skipped).await? else {
                continue;
            };

            summary.state = summary.state.transition(CycleState::Fetching)?;
            let artifact = self
                .fetcher
                .fetch(&file.id, file.mime_type.as_deref(), file.name.as_deref())
                .await?;

            summary.state = summary.state.transition(CycleState::Uploading)?;
            let ingested = self
                .ingestion
                .upload(&artifact)
                .await
                .with_context(|| format!("Failed to upload {} ({})", artifact.filename, file.id))?;
            summary.uploaded += 1;

            info!(
                file_id = %file.id,
                filename = %artifact.filename,
                bytes = artifact.bytes.len(),
                document_id = ingested.document_id.as_deref(),
                "Relayed file"
            );
        }

        summary.state = summary.state.transition(CycleState::Committing)?;
        match batch.next_token {
            Some(next) => {
                self.store
                    .merge(&StatePatch::page_token(next.clone()))
                    .await
                    .context("Failed to commit page token")?;
                summary.committed_token = Some(next);
            }
            None => debug!("Provider reported no new page token; keeping stored cursor"),
        }
        summary.state = summary.state.transition(CycleState::Idle)?;

        Ok(())
    }

    /// Applies the record filters, returning the fresh snapshot if the file
    /// should be relayed
    ///
    /// Removal and missing ids are checked before any remote call; the
    /// embedded metadata of a record is never trusted beyond its removal flag.
    async fn eligible_file(
        &self,
        record: &ChangeRecord,
        skipped: &mut SkipCounts,
    ) -> Result<Option<FileSnapshot>> {
        if record.removed {
            debug!(file_id = ?record.file_id, "Skipping removed file");
            skipped.record(SkipReason::Removed);
            return Ok(None);
        }
        let Some(file_id) = &record.file_id else {
            debug!("Skipping change without file id");
            skipped.record(SkipReason::MissingFileId);
            return Ok(None);
        };

        let file = self
            .drive
            .get_file(file_id)
            .await
            .with_context(|| format!("Failed to read metadata of {file_id}"))?;

        let reason = if file.trashed {
            Some(SkipReason::Trashed)
        } else if self
            .target_folder
            .as_deref()
            .is_some_and(|folder| !file.is_in_folder(folder))
        {
            Some(SkipReason::OutsideTargetFolder)
        } else if file.is_container() {
            Some(SkipReason::Container)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                debug!(file_id = %file_id, reason = ?reason, "Skipping file");
                skipped.record(reason);
                Ok(None)
            }
            None => Ok(Some(file)),
        }
    }
}

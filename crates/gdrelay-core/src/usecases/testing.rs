//! In-memory port implementations for use case tests
//!
//! Every mock appends to a shared [`CallLog`] so tests can assert both which
//! calls happened and in what order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;

use crate::domain::{
    ChangeRecord, FileId, FileSnapshot, PageToken, RelayState, StatePatch, UploadArtifact,
    WatchChannel, WatchRequest,
};
use crate::ports::{
    ChangeBatch, ICursorStore, ICycleLease, IDriveProvider, IIngestionService, IngestionRecord,
};

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

pub fn token(s: &str) -> PageToken {
    PageToken::new(s.to_string()).unwrap()
}

pub fn file_id(s: &str) -> FileId {
    FileId::new(s.to_string()).unwrap()
}

pub fn snapshot(id: &str, name: &str, mime_type: &str, parents: &[&str]) -> FileSnapshot {
    FileSnapshot {
        id: file_id(id),
        name: Some(name.to_string()),
        mime_type: Some(mime_type.to_string()),
        trashed: false,
        parents: parents.iter().map(|p| p.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Drive
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockDrive {
    pub log: CallLog,
    pub start_token: Mutex<Option<PageToken>>,
    /// Change batches keyed by the token they are listed from
    pub batches: Mutex<HashMap<String, ChangeBatch>>,
    pub files: Mutex<HashMap<String, FileSnapshot>>,
    pub fail_list: Mutex<bool>,
    pub fail_watch: Mutex<bool>,
    /// File ids whose download or export fails
    pub fail_content: Mutex<Vec<String>>,
    pub watch_requests: Mutex<Vec<WatchRequest>>,
}

impl MockDrive {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn with_batch(self, from: &str, records: Vec<ChangeRecord>, next: Option<&str>) -> Self {
        self.batches.lock().unwrap().insert(
            from.to_string(),
            ChangeBatch {
                records,
                next_token: next.map(token),
            },
        );
        self
    }

    pub fn with_file(self, file: FileSnapshot) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(file.id.as_str().to_string(), file);
        self
    }

    pub fn with_start_token(self, start: &str) -> Self {
        *self.start_token.lock().unwrap() = Some(token(start));
        self
    }

    pub fn failing_content(self, id: &str) -> Self {
        self.fail_content.lock().unwrap().push(id.to_string());
        self
    }

    fn content_fails(&self, id: &FileId) -> bool {
        self.fail_content
            .lock()
            .unwrap()
            .iter()
            .any(|f| f == id.as_str())
    }
}

#[async_trait::async_trait]
impl IDriveProvider for MockDrive {
    async fn get_start_page_token(&self) -> anyhow::Result<PageToken> {
        self.log.push("start_token");
        self.start_token
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("no start token"))
    }

    async fn list_changes(&self, from: &PageToken) -> anyhow::Result<ChangeBatch> {
        self.log.push(format!("list_changes:{from}"));
        if *self.fail_list.lock().unwrap() {
            return Err(anyhow!("changes.list failed"));
        }
        Ok(self
            .batches
            .lock()
            .unwrap()
            .get(from.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn get_file(&self, id: &FileId) -> anyhow::Result<FileSnapshot> {
        self.log.push(format!("get_file:{id}"));
        self.files
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("file {id} not found"))
    }

    async fn export_file(&self, id: &FileId, mime_type: &str) -> anyhow::Result<Vec<u8>> {
        self.log.push(format!("export:{id}:{mime_type}"));
        if self.content_fails(id) {
            return Err(anyhow!("files.export failed for {id}"));
        }
        Ok(format!("exported {id}").into_bytes())
    }

    async fn download_file(&self, id: &FileId) -> anyhow::Result<Vec<u8>> {
        self.log.push(format!("download:{id}"));
        if self.content_fails(id) {
            return Err(anyhow!("files.get media failed for {id}"));
        }
        Ok(format!("content of {id}").into_bytes())
    }

    async fn watch_changes(
        &self,
        from: &PageToken,
        request: &WatchRequest,
    ) -> anyhow::Result<WatchChannel> {
        self.log.push(format!("watch:{from}"));
        self.watch_requests.lock().unwrap().push(request.clone());
        if *self.fail_watch.lock().unwrap() {
            return Err(anyhow!("changes.watch failed"));
        }
        Ok(WatchChannel {
            id: request.channel_id,
            resource_id: Some("resource-1".to_string()),
            expiration: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Cursor store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockStore {
    pub log: CallLog,
    pub state: Mutex<RelayState>,
    pub fail_read: Mutex<bool>,
}

impl MockStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn with_token(self, value: &str) -> Self {
        self.state.lock().unwrap().page_token = Some(token(value));
        self
    }

    pub fn page_token(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .page_token
            .as_ref()
            .map(|t| t.to_string())
    }
}

#[async_trait::async_trait]
impl ICursorStore for MockStore {
    async fn read(&self) -> anyhow::Result<RelayState> {
        self.log.push("store_read");
        if *self.fail_read.lock().unwrap() {
            return Err(anyhow!("store unavailable"));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn merge(&self, patch: &StatePatch) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(page_token) = &patch.page_token {
            self.log.push(format!("store_merge:pageToken={page_token}"));
            state.page_token = Some(page_token.clone());
        }
        if let Some(channel_id) = &patch.channel_id {
            self.log.push(format!("store_merge:channelId={channel_id}"));
            state.channel_id = Some(channel_id.clone());
        }
        if patch.channel_resource_id.is_some() {
            state.channel_resource_id = patch.channel_resource_id.clone();
        }
        if patch.channel_expiration.is_some() {
            state.channel_expiration = patch.channel_expiration;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockIngestion {
    pub log: CallLog,
    pub uploads: Mutex<Vec<UploadArtifact>>,
    /// Zero-based index of the upload attempt that fails
    pub fail_at: Mutex<Option<usize>>,
    attempts: Mutex<usize>,
}

impl MockIngestion {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn failing_at(self, attempt: usize) -> Self {
        *self.fail_at.lock().unwrap() = Some(attempt);
        self
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.filename.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl IIngestionService for MockIngestion {
    async fn upload(&self, artifact: &UploadArtifact) -> anyhow::Result<IngestionRecord> {
        self.log.push(format!("upload:{}", artifact.filename));
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let current = *attempts;
            *attempts += 1;
            current
        };
        if *self.fail_at.lock().unwrap() == Some(attempt) {
            return Err(anyhow!("dify returned 500: boom"));
        }
        self.uploads.lock().unwrap().push(artifact.clone());
        Ok(IngestionRecord {
            document_id: Some(format!("doc-{attempt}")),
            document_name: Some(artifact.filename.clone()),
            batch: None,
            raw: serde_json::json!({}),
        })
    }
}

// ---------------------------------------------------------------------------
// Cycle lease
// ---------------------------------------------------------------------------

/// Lease shared by several [`CycleLock`](super::CycleLock)s standing in for
/// separate processes; never expires
#[derive(Default)]
pub struct MemoryLease {
    holder: Mutex<Option<String>>,
    fail: Mutex<bool>,
}

impl MemoryLease {
    pub fn holder(&self) -> Option<String> {
        self.holder.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait::async_trait]
impl ICycleLease for MemoryLease {
    async fn try_acquire(&self, holder: &str, _ttl: Duration) -> anyhow::Result<bool> {
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("lease table unavailable"));
        }
        let mut current = self.holder.lock().unwrap();
        match current.as_deref() {
            Some(other) if other != holder => Ok(false),
            _ => {
                *current = Some(holder.to_string());
                Ok(true)
            }
        }
    }

    async fn release(&self, holder: &str) -> anyhow::Result<()> {
        let mut current = self.holder.lock().unwrap();
        if current.as_deref() == Some(holder) {
            *current = None;
        }
        Ok(())
    }
}

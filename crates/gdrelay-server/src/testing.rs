//! Test doubles for route and command tests
//!
//! The cursor store is the real SQLite store on an in-memory database; Drive
//! and the ingestion service are stubs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;

use gdrelay_core::config::{Config, ConfigBuilder};
use gdrelay_core::domain::{
    ChangeRecord, FileId, FileSnapshot, PageToken, RelayState, StatePatch, UploadArtifact,
    WatchChannel, WatchRequest,
};
use gdrelay_core::ports::{
    ChangeBatch, ICursorStore, IDriveProvider, IIngestionService, IngestionRecord,
};
use gdrelay_core::usecases::CycleLock;
use gdrelay_state::{DatabasePool, SqliteCursorStore, SqliteCycleLease};

use crate::app::AppState;

pub const CHANNEL_TOKEN: &str = "test-channel-token";
pub const PUBLIC_URL: &str = "https://relay.example.com";
pub const PROJECT: &str = "relay-test";

/// Lease lifetime and wait used by harness locks; short so busy cases fail fast
pub const LEASE_TTL: Duration = Duration::from_secs(60);
const LEASE_WAIT: Duration = Duration::from_millis(200);

fn token(s: &str) -> PageToken {
    PageToken::new(s.to_string()).unwrap()
}

#[derive(Default)]
pub struct StubDrive {
    start_token: Option<String>,
    batches: HashMap<String, (Vec<String>, Option<String>)>,
    files: HashMap<String, (String, String)>,
    calls: Mutex<Vec<String>>,
    watch_addresses: Mutex<Vec<String>>,
}

impl StubDrive {
    pub fn with_start_token(mut self, start: &str) -> Self {
        self.start_token = Some(start.to_string());
        self
    }

    pub fn with_batch(mut self, from: &str, ids: &[&str], next: Option<&str>) -> Self {
        self.batches.insert(
            from.to_string(),
            (
                ids.iter().map(|id| id.to_string()).collect(),
                next.map(str::to_string),
            ),
        );
        self
    }

    pub fn with_file(mut self, id: &str, name: &str, mime_type: &str) -> Self {
        self.files
            .insert(id.to_string(), (name.to_string(), mime_type.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn watch_addresses(&self) -> Vec<String> {
        self.watch_addresses.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl IDriveProvider for StubDrive {
    async fn get_start_page_token(&self) -> anyhow::Result<PageToken> {
        self.record("start_token".into());
        self.start_token
            .as_deref()
            .map(token)
            .ok_or_else(|| anyhow!("no start token"))
    }

    async fn list_changes(&self, from: &PageToken) -> anyhow::Result<ChangeBatch> {
        self.record(format!("list_changes:{from}"));
        let Some((ids, next)) = self.batches.get(from.as_str()) else {
            return Ok(ChangeBatch::default());
        };
        Ok(ChangeBatch {
            records: ids
                .iter()
                .map(|id| ChangeRecord::changed(FileId::new(id.clone()).unwrap()))
                .collect(),
            next_token: next.as_deref().map(token),
        })
    }

    async fn get_file(&self, id: &FileId) -> anyhow::Result<FileSnapshot> {
        self.record(format!("get_file:{id}"));
        let (name, mime_type) = self
            .files
            .get(id.as_str())
            .ok_or_else(|| anyhow!("file {id} not found"))?;
        Ok(FileSnapshot {
            id: id.clone(),
            name: Some(name.clone()),
            mime_type: Some(mime_type.clone()),
            trashed: false,
            parents: vec!["root".to_string()],
        })
    }

    async fn export_file(&self, id: &FileId, mime_type: &str) -> anyhow::Result<Vec<u8>> {
        self.record(format!("export:{id}:{mime_type}"));
        Ok(b"exported".to_vec())
    }

    async fn download_file(&self, id: &FileId) -> anyhow::Result<Vec<u8>> {
        self.record(format!("download:{id}"));
        Ok(b"content".to_vec())
    }

    async fn watch_changes(
        &self,
        from: &PageToken,
        request: &WatchRequest,
    ) -> anyhow::Result<WatchChannel> {
        self.record(format!("watch:{from}"));
        self.watch_addresses
            .lock()
            .unwrap()
            .push(request.address.clone());
        Ok(WatchChannel {
            id: request.channel_id,
            resource_id: Some("resource-1".to_string()),
            expiration: None,
        })
    }
}

#[derive(Default)]
pub struct StubIngestion {
    uploads: AtomicUsize,
    failing: AtomicBool,
}

impl StubIngestion {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IIngestionService for StubIngestion {
    async fn upload(&self, artifact: &UploadArtifact) -> anyhow::Result<IngestionRecord> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("dify returned 500: boom"));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(IngestionRecord {
            document_id: Some(format!("doc-{}", artifact.filename)),
            document_name: Some(artifact.filename.clone()),
            batch: None,
            raw: serde_json::json!({}),
        })
    }
}

/// A store whose every call fails
pub struct FailingStore;

#[async_trait::async_trait]
impl ICursorStore for FailingStore {
    async fn read(&self) -> anyhow::Result<RelayState> {
        Err(anyhow!("store unavailable"))
    }

    async fn merge(&self, _patch: &StatePatch) -> anyhow::Result<()> {
        Err(anyhow!("store unavailable"))
    }
}

pub fn test_config(public_url: Option<&str>) -> Config {
    let mut builder = ConfigBuilder::new()
        .ingestion_dataset_id("ds-1")
        .ingestion_api_key("key-1")
        .webhook_channel_token(CHANNEL_TOKEN)
        .drive_project(PROJECT);
    if let Some(url) = public_url {
        builder = builder.webhook_public_url(url);
    }
    builder.build()
}

pub struct Harness {
    pub state: AppState,
    pub drive: Arc<StubDrive>,
    pub ingestion: Arc<StubIngestion>,
    /// Lease on the harness database, as another process would see it
    pub lease: SqliteCycleLease,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(StubDrive::default(), Some(PUBLIC_URL), None).await
    }

    pub async fn with_drive(drive: StubDrive) -> Self {
        Self::build(drive, Some(PUBLIC_URL), None).await
    }

    pub async fn with_public_url(public_url: Option<&str>) -> Self {
        Self::build(StubDrive::default(), public_url, None).await
    }

    pub async fn with_failing_store() -> Self {
        Self::build(StubDrive::default(), Some(PUBLIC_URL), Some(Arc::new(FailingStore))).await
    }

    async fn build(
        drive: StubDrive,
        public_url: Option<&str>,
        store: Option<Arc<dyn ICursorStore>>,
    ) -> Self {
        let pool = DatabasePool::in_memory().await.unwrap();
        let store = store.unwrap_or_else(|| {
            Arc::new(SqliteCursorStore::new(pool.pool().clone())) as Arc<dyn ICursorStore>
        });
        let lease = SqliteCycleLease::new(pool.pool().clone());
        let lock = CycleLock::new()
            .with_lease(Arc::new(lease.clone()))
            .with_lease_timing(LEASE_TTL, LEASE_WAIT);
        let drive = Arc::new(drive);
        let ingestion = Arc::new(StubIngestion::default());
        let state = AppState::from_ports(
            test_config(public_url),
            Arc::clone(&drive) as Arc<dyn IDriveProvider>,
            store,
            Arc::clone(&ingestion) as Arc<dyn IIngestionService>,
            lock,
        );
        Self {
            state,
            drive,
            ingestion,
            lease,
        }
    }

    pub async fn seed_token(&self, value: &str) {
        self.state
            .store
            .merge(&StatePatch::page_token(token(value)))
            .await
            .unwrap();
    }

    pub async fn stored_token(&self) -> Option<String> {
        self.state
            .store
            .read()
            .await
            .unwrap()
            .page_token
            .map(|t| t.as_str().to_string())
    }
}

//! Ingestion service port (driven/secondary port)
//!
//! The document-indexing service that fetched content is relayed to.

use serde::{Deserialize, Serialize};

use crate::domain::UploadArtifact;

/// Parsed response of a successful upload
///
/// Only the fields the relay logs are typed; the full body is kept in `raw`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub document_id: Option<String>,
    pub document_name: Option<String>,
    pub batch: Option<String>,
    pub raw: serde_json::Value,
}

/// Port trait for the ingestion service
///
/// Uploads are not idempotent: a retried cycle may upload the same content
/// again, and deduplication is the ingestion service's concern.
#[async_trait::async_trait]
pub trait IIngestionService: Send + Sync {
    /// Uploads one artifact and returns the service's record of it
    async fn upload(&self, artifact: &UploadArtifact) -> anyhow::Result<IngestionRecord>;
}

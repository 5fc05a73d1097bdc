//! Document upload to a Dify dataset
//!
//! The first attempt sends only the `file` part. Datasets created without a
//! default indexing technique reject that with 400; exactly one retry then
//! adds a `data` field naming the technique. Any other failure, and a failed
//! retry, is returned as [`RelayError::Upstream`] with the start of the body.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use gdrelay_core::domain::{RelayError, UploadArtifact};
use gdrelay_core::ports::{IIngestionService, IngestionRecord};

use crate::client::{DifyClient, DifySettings};

const SERVICE: &str = "dify";

/// Parsed fields of a `create-by-file` response
#[derive(Debug, Default, Deserialize)]
struct CreateDocumentResponse {
    document: Option<DocumentInfo>,
    batch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentInfo {
    id: Option<String>,
    name: Option<String>,
}

fn file_part(artifact: &UploadArtifact) -> Result<Part> {
    Part::bytes(artifact.bytes.clone())
        .file_name(artifact.filename.clone())
        .mime_str("application/octet-stream")
        .context("Failed to build multipart file part")
}

/// Body of the `data` field sent on the retry
fn process_rule(indexing_technique: &str) -> String {
    serde_json::json!({ "indexing_technique": indexing_technique }).to_string()
}

fn parse_record(raw: serde_json::Value) -> IngestionRecord {
    let parsed: CreateDocumentResponse =
        serde_json::from_value(raw.clone()).unwrap_or_default();
    let document = parsed.document.unwrap_or_default();
    IngestionRecord {
        document_id: document.id,
        document_name: document.name,
        batch: parsed.batch,
        raw,
    }
}

/// `IIngestionService` implementation over the Dify dataset API
#[derive(Debug, Clone)]
pub struct DifyIngestion {
    client: DifyClient,
}

impl DifyIngestion {
    pub fn new(settings: DifySettings) -> Self {
        Self {
            client: DifyClient::new(settings),
        }
    }

    pub fn client(&self) -> &DifyClient {
        &self.client
    }

    async fn send(&self, form: Form) -> Result<reqwest::Response> {
        self.client
            .create_by_file()?
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")
    }

    async fn into_record(response: reqwest::Response) -> Result<IngestionRecord> {
        let raw: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse upload response")?;
        Ok(parse_record(raw))
    }

    async fn upstream_error(response: reqwest::Response) -> anyhow::Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        RelayError::upstream(SERVICE, status, &body).into()
    }
}

#[async_trait::async_trait]
impl IIngestionService for DifyIngestion {
    async fn upload(&self, artifact: &UploadArtifact) -> Result<IngestionRecord> {
        // Fail on missing credentials before building any request body
        self.client.create_by_file()?;

        debug!(filename = %artifact.filename, bytes = artifact.bytes.len(), "Uploading document");
        let first = self
            .send(Form::new().part("file", file_part(artifact)?))
            .await?;

        if first.status().is_success() {
            let record = Self::into_record(first).await?;
            info!(filename = %artifact.filename, document_id = record.document_id.as_deref(), "Document uploaded");
            return Ok(record);
        }
        if first.status() != StatusCode::BAD_REQUEST {
            return Err(Self::upstream_error(first).await);
        }

        let rejected = first.text().await.unwrap_or_default();
        warn!(
            filename = %artifact.filename,
            body = %rejected.chars().take(200).collect::<String>(),
            "Upload rejected with 400; retrying with indexing technique"
        );

        let form = Form::new()
            .part("file", file_part(artifact)?)
            .text(
                "data",
                process_rule(&self.client.settings().indexing_technique),
            );
        let second = self.send(form).await?;

        if !second.status().is_success() {
            return Err(Self::upstream_error(second).await);
        }
        let record = Self::into_record(second).await?;
        info!(
            filename = %artifact.filename,
            document_id = record.document_id.as_deref(),
            "Document uploaded on retry"
        );
        Ok(record)
    }
}

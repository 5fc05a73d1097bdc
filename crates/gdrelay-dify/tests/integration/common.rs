//! Shared helpers for Dify upload tests

use wiremock::{Match, MockServer, Request};

use gdrelay_core::config::ConfigBuilder;
use gdrelay_core::domain::UploadArtifact;
use gdrelay_dify::{DifyIngestion, DifySettings};

pub const DATASET_ID: &str = "ds-test";
pub const API_KEY: &str = "dataset-key";

pub fn upload_path() -> String {
    format!("/v1/datasets/{DATASET_ID}/document/create-by-file")
}

/// Starts a mock server and an ingestion adapter pointed at it
pub async fn setup_dify_mock() -> (MockServer, DifyIngestion) {
    let server = MockServer::start().await;
    let config = ConfigBuilder::new()
        .ingestion_api_base(server.uri())
        .ingestion_dataset_id(DATASET_ID)
        .ingestion_api_key(API_KEY)
        .ingestion_timeout_secs(5)
        .build();
    let ingestion = DifyIngestion::new(DifySettings::from_config(&config.ingestion));
    (server, ingestion)
}

pub fn artifact(name: &str, content: &str) -> UploadArtifact {
    UploadArtifact {
        filename: name.to_string(),
        bytes: content.as_bytes().to_vec(),
    }
}

pub fn document_response(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "document": {
            "id": id,
            "name": name,
            "indexing_status": "waiting"
        },
        "batch": "20261015093000123456"
    })
}

/// Matches multipart bodies that carry (or lack) a `data` form field
pub struct HasDataField(pub bool);

impl Match for HasDataField {
    fn matches(&self, request: &Request) -> bool {
        let body = String::from_utf8_lossy(&request.body);
        body.contains("name=\"data\"") == self.0
    }
}

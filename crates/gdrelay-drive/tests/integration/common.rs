//! Shared helpers for Drive API integration tests
//!
//! Each helper mounts mock endpoints on a wiremock server; `setup_drive_mock`
//! returns a provider already connected to that server.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gdrelay_core::domain::{FileId, PageToken};
use gdrelay_drive::changes::ListOptions;
use gdrelay_drive::client::DriveClient;
use gdrelay_drive::GoogleDriveProvider;

pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and a provider pointed at it
pub async fn setup_drive_mock() -> (MockServer, GoogleDriveProvider) {
    setup_drive_mock_with(ListOptions::default()).await
}

pub async fn setup_drive_mock_with(list: ListOptions) -> (MockServer, GoogleDriveProvider) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url(TEST_TOKEN, server.uri());
    (server, GoogleDriveProvider::with_client(client, list))
}

pub fn token(s: &str) -> PageToken {
    PageToken::new(s.to_string()).unwrap()
}

pub fn file_id(s: &str) -> FileId {
    FileId::new(s.to_string()).unwrap()
}

/// Mounts one page of `GET /changes` answered for `from`
pub async fn mount_changes_page(
    server: &MockServer,
    from: &str,
    changes: serde_json::Value,
    next_page_token: Option<&str>,
    new_start_page_token: Option<&str>,
) {
    let mut body = serde_json::json!({
        "kind": "drive#changeList",
        "changes": changes,
    });
    if let Some(next) = next_page_token {
        body["nextPageToken"] = next.into();
    }
    if let Some(start) = new_start_page_token {
        body["newStartPageToken"] = start.into();
    }

    Mock::given(method("GET"))
        .and(path("/changes"))
        .and(query_param("pageToken", from))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts `GET /files/{id}` with the given metadata
pub async fn mount_file_metadata(server: &MockServer, id: &str, metadata: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .and(query_param("fields", "id,name,mimeType,trashed,parents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata))
        .mount(server)
        .await;
}

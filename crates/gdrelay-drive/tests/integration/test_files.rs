//! Integration tests for file metadata and content retrieval

use gdrelay_core::domain::RelayError;
use gdrelay_core::ports::IDriveProvider;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, file_id, TEST_TOKEN};

#[tokio::test]
async fn test_get_file_snapshot() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_file_metadata(
        &server,
        "f1",
        serde_json::json!({
            "id": "f1",
            "name": "Budget",
            "mimeType": "application/vnd.google-apps.spreadsheet",
            "trashed": true,
            "parents": ["folder-a", "folder-b"]
        }),
    )
    .await;

    let snapshot = provider.get_file(&file_id("f1")).await.unwrap();

    assert_eq!(snapshot.name.as_deref(), Some("Budget"));
    assert!(snapshot.trashed);
    assert!(snapshot.is_in_folder("folder-b"));
}

#[tokio::test]
async fn test_export_uses_target_mime_type() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/doc1/export"))
        .and(query_param("mimeType", "application/pdf"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = provider
        .export_file(&file_id("doc1"), "application/pdf")
        .await
        .unwrap();
    assert_eq!(bytes, b"%PDF-1.7".to_vec());
}

#[tokio::test]
async fn test_download_uses_alt_media() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/bin1"))
        .and(query_param("alt", "media"))
        .and(query_param("supportsAllDrives", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 3]))
        .mount(&server)
        .await;

    let bytes = provider.download_file(&file_id("bin1")).await.unwrap();
    assert_eq!(bytes, vec![0u8, 1, 2, 3]);
}

#[tokio::test]
async fn test_missing_file_is_upstream_404() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found: gone"))
        .mount(&server)
        .await;

    let err = provider.get_file(&file_id("gone")).await.unwrap_err();
    match err.downcast_ref::<RelayError>() {
        Some(RelayError::Upstream { status, body, .. }) => {
            assert_eq!(*status, 404);
            assert!(body.contains("gone"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

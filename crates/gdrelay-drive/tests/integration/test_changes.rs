//! Integration tests for change enumeration
//!
//! - Single page ending in a new start page token
//! - Pagination across pages, records kept in order
//! - Page cap resuming from the last next page token
//! - Missing tokens and error statuses

use gdrelay_core::domain::RelayError;
use gdrelay_core::ports::IDriveProvider;
use gdrelay_drive::changes::ListOptions;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, token};

#[tokio::test]
async fn test_single_page_returns_new_start_token() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_changes_page(
        &server,
        "100",
        serde_json::json!([
            { "fileId": "f1", "removed": false, "file": { "id": "f1", "name": "a.txt" } },
            { "fileId": "f2", "removed": true }
        ]),
        None,
        Some("101"),
    )
    .await;

    let batch = provider.list_changes(&token("100")).await.unwrap();

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.next_token, Some(token("101")));
    assert!(!batch.records[0].removed);
    assert!(batch.records[1].removed);
}

#[tokio::test]
async fn test_requests_cover_all_drives() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/changes"))
        .and(query_param("pageToken", "1"))
        .and(query_param("includeItemsFromAllDrives", "true"))
        .and(query_param("supportsAllDrives", "true"))
        .and(query_param("pageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "changes": [],
            "newStartPageToken": "2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let batch = provider.list_changes(&token("1")).await.unwrap();
    assert!(batch.records.is_empty());
    assert_eq!(batch.next_token, Some(token("2")));
}

#[tokio::test]
async fn test_pagination_accumulates_in_order() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_changes_page(
        &server,
        "A",
        serde_json::json!([{ "fileId": "p1" }, { "fileId": "p2" }]),
        Some("A2"),
        None,
    )
    .await;
    common::mount_changes_page(
        &server,
        "A2",
        serde_json::json!([{ "fileId": "p3" }]),
        None,
        Some("B"),
    )
    .await;

    let batch = provider.list_changes(&token("A")).await.unwrap();

    let ids: Vec<&str> = batch
        .records
        .iter()
        .filter_map(|r| r.file_id.as_ref().map(|f| f.as_str()))
        .collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    assert_eq!(batch.next_token, Some(token("B")));
}

#[tokio::test]
async fn test_page_cap_resumes_from_next_page_token() {
    let (server, provider) = common::setup_drive_mock_with(ListOptions {
        page_size: 2,
        max_pages: 1,
    })
    .await;
    common::mount_changes_page(
        &server,
        "A",
        serde_json::json!([{ "fileId": "p1" }, { "fileId": "p2" }]),
        Some("A2"),
        None,
    )
    .await;

    let batch = provider.list_changes(&token("A")).await.unwrap();

    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.next_token, Some(token("A2")));
}

#[tokio::test]
async fn test_page_without_tokens_has_no_next_token() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_changes_page(
        &server,
        "A",
        serde_json::json!([{ "fileId": "p1" }]),
        None,
        None,
    )
    .await;

    let batch = provider.list_changes(&token("A")).await.unwrap();
    assert_eq!(batch.records.len(), 1);
    assert!(batch.next_token.is_none());
}

#[tokio::test]
async fn test_error_status_is_upstream_error() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backendError"))
        .mount(&server)
        .await;

    let err = provider.list_changes(&token("A")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RelayError>(),
        Some(RelayError::Upstream { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_get_start_page_token() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .and(query_param("supportsAllDrives", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "drive#startPageToken",
            "startPageToken": "4242"
        })))
        .mount(&server)
        .await;

    assert_eq!(
        provider.get_start_page_token().await.unwrap(),
        token("4242")
    );
}

#[tokio::test]
async fn test_start_page_token_missing_is_error() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    assert!(provider.get_start_page_token().await.is_err());
}

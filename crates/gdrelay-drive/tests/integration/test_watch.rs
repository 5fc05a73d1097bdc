//! Integration tests for watch channel registration

use gdrelay_core::domain::{ChannelId, WatchRequest};
use gdrelay_core::ports::IDriveProvider;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, token};

#[tokio::test]
async fn test_watch_registers_web_hook_channel() {
    let (server, provider) = common::setup_drive_mock().await;
    let channel_id = ChannelId::new();

    Mock::given(method("POST"))
        .and(path("/changes/watch"))
        .and(query_param("pageToken", "77"))
        .and(query_param("supportsAllDrives", "true"))
        .and(query_param("includeItemsFromAllDrives", "true"))
        .and(body_partial_json(serde_json::json!({
            "id": channel_id.to_string(),
            "type": "web_hook",
            "address": "https://relay.example.run.app/drive-webhook",
            "token": "s3cr3t"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "api#channel",
            "id": channel_id.to_string(),
            "resourceId": "res-9",
            "resourceUri": "https://www.googleapis.com/drive/v3/changes",
            "expiration": "1760572800000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = WatchRequest {
        channel_id,
        address: "https://relay.example.run.app/drive-webhook".to_string(),
        token: "s3cr3t".to_string(),
    };
    let channel = provider.watch_changes(&token("77"), &request).await.unwrap();

    assert_eq!(channel.id, channel_id);
    assert_eq!(channel.resource_id.as_deref(), Some("res-9"));
    assert_eq!(channel.expiration.map(|e| e.timestamp()), Some(1_760_572_800));
}

#[tokio::test]
async fn test_watch_rejection_propagates() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path("/changes/watch"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("Unauthorized WebHook callback channel"),
        )
        .mount(&server)
        .await;

    let request = WatchRequest {
        channel_id: ChannelId::new(),
        address: "https://relay.example.run.app/drive-webhook".to_string(),
        token: "s3cr3t".to_string(),
    };
    let err = provider
        .watch_changes(&token("1"), &request)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Unauthorized WebHook"));
}

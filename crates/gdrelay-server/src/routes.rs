//! HTTP routes
//!
//! | Route                 | Method     | Success                         |
//! |-----------------------|------------|---------------------------------|
//! | `/`                   | GET        | 200 `ok`                        |
//! | `/init`               | GET, POST  | 200 `{ok, channel_id, startPageToken}` |
//! | `/drive-webhook`      | POST       | 204                             |
//! | `/debug/info`         | GET        | 200 configuration and state     |
//! | `/debug/pull`         | POST       | 200 `{ok, ...summary}`          |
//!
//! Failures are classified by the [`RelayError`] carried in the error chain.
//! A cycle refused because another process holds the lease answers 503.

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use gdrelay_core::config::DEFAULT_CHANNEL_TOKEN;
use gdrelay_core::domain::watch::WEBHOOK_PATH;
use gdrelay_core::domain::RelayError;
use gdrelay_core::usecases::authenticate_webhook::CHANNEL_TOKEN_HEADER;

use crate::app::AppState;

pub type HttpResponse = Response<Full<Bytes>>;

/// Header Drive uses to report the notification kind (`sync`, `change`, ...)
const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";

const KNOWN_PATHS: &[&str] = &["/", "/init", WEBHOOK_PATH, "/debug/info", "/debug/pull"];

/// Entry point for the hyper service
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let channel_token = header_value(&req, CHANNEL_TOKEN_HEADER);
    if let Some(resource_state) = header_value(&req, RESOURCE_STATE_HEADER) {
        debug!(resource_state = %resource_state, "Drive notification kind");
    }
    Ok(route(&state, req.method(), req.uri().path(), channel_token.as_deref()).await)
}

fn header_value<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Dispatches on method and path; the request body is never read
pub async fn route(
    state: &AppState,
    method: &Method,
    path: &str,
    channel_token: Option<&str>,
) -> HttpResponse {
    match (method, path) {
        (&Method::GET, "/") => text(StatusCode::OK, "ok"),
        (&Method::GET | &Method::POST, "/init") => init(state).await,
        (&Method::POST, WEBHOOK_PATH) => drive_webhook(state, channel_token).await,
        (&Method::GET, "/debug/info") => debug_info(state).await,
        (&Method::POST, "/debug/pull") => debug_pull(state).await,
        (_, path) if KNOWN_PATHS.contains(&path) => {
            text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn init(state: &AppState) -> HttpResponse {
    match state.watch.initialize().await {
        Ok(init) => {
            info!(
                channel_id = %init.channel.id,
                start_token = %init.start_token,
                "Watch channel initialized"
            );
            json_response(
                StatusCode::OK,
                json!({
                    "ok": true,
                    "channel_id": init.channel.id.to_string(),
                    "startPageToken": init.start_token.as_str(),
                }),
            )
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "/init failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

async fn drive_webhook(state: &AppState, channel_token: Option<&str>) -> HttpResponse {
    info!("drive-webhook called");
    if let Err(e) = state.authenticator.verify(channel_token) {
        warn!(error = %e, "Rejected notification");
        return empty(StatusCode::FORBIDDEN);
    }

    match state.processor.process_pending().await {
        Ok(_) => empty(StatusCode::NO_CONTENT),
        Err(e) if matches!(relay_error(&e), Some(RelayError::Busy(_))) => {
            warn!(error = %format!("{e:#}"), "Cycle already running elsewhere; Drive will redeliver");
            failure(StatusCode::SERVICE_UNAVAILABLE, &e)
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "/drive-webhook failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

async fn debug_info(state: &AppState) -> HttpResponse {
    let config = &state.config;
    let mut info = json!({
        "webhook_url": config.webhook.public_url,
        "project": config.drive.project,
        "dify_api": config.ingestion.api_base,
        "has_dify_key": config.ingestion.api_key.as_deref().is_some_and(|k| !k.is_empty()),
        "has_dataset_id": config.ingestion.dataset_id.as_deref().is_some_and(|d| !d.is_empty()),
        "channel_token_set": !config.webhook.channel_token.is_empty(),
        "channel_token_is_default": config.webhook.channel_token == DEFAULT_CHANNEL_TOKEN,
        "target_folder_id": config.target_folder(),
        "last_cycle": state.processor.last_summary(),
    });

    match state.store.read().await {
        Ok(relay) => {
            info["stored_page_token"] = json!(relay.page_token);
            info["channel"] = json!({
                "id": relay.channel_id,
                "resource_id": relay.channel_resource_id,
                "expiration": relay.channel_expiration,
            });
            info["updated_at"] = json!(relay.updated_at);
            json_response(StatusCode::OK, info)
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "debug_info failed");
            info["error"] = json!(format!("{e:#}"));
            json_response(StatusCode::INTERNAL_SERVER_ERROR, info)
        }
    }
}

async fn debug_pull(state: &AppState) -> HttpResponse {
    match state.processor.process_pending().await {
        Ok(summary) => {
            let mut body = serde_json::to_value(&summary).unwrap_or_else(|_| json!({}));
            body["ok"] = json!(true);
            json_response(StatusCode::OK, body)
        }
        Err(e) if matches!(relay_error(&e), Some(RelayError::MissingCursor)) => json_response(
            StatusCode::BAD_REQUEST,
            json!({ "ok": false, "error": "no pageToken; call /init first" }),
        ),
        Err(e) if matches!(relay_error(&e), Some(RelayError::Busy(_))) => {
            failure(StatusCode::SERVICE_UNAVAILABLE, &e)
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Manual pull failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

/// Finds the first [`RelayError`] in the error chain
pub fn relay_error(err: &anyhow::Error) -> Option<&RelayError> {
    err.chain().find_map(|cause| cause.downcast_ref::<RelayError>())
}

fn failure(status: StatusCode, err: &anyhow::Error) -> HttpResponse {
    json_response(status, json!({ "ok": false, "error": format!("{err:#}") }))
}

fn json_response(status: StatusCode, body: Value) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn empty(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

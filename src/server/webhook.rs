//! Per-request logic for the webhook listener.
//!
//! Trello probes the callback URL with HEAD at registration time and
//! delivers events with POST (PUT is accepted for parity with older
//! deliveries). Verification happens against the raw body before any
//! parsing; an unverified body is never parsed and never dispatched.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::AppState;
use crate::webhooks::{dispatch, verify_signature};

/// Header carrying Trello's base64 HMAC signature.
pub const HEADER_SIGNATURE: &str = "x-trello-webhook";

/// Handles every request the listener receives, on any path.
///
/// - `HEAD` → 200 empty, no authentication, no dispatch.
/// - `POST`/`PUT` → verify, then 200 (dispatch continues off the request
///   path) or 400 on a bad signature.
/// - anything else → 405.
pub async fn relay_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::HEAD {
        StatusCode::OK.into_response()
    } else if method == Method::POST || method == Method::PUT {
        handle_delivery(state, &headers, body)
    } else {
        StatusCode::METHOD_NOT_ALLOWED.into_response()
    }
}

fn handle_delivery(state: AppState, headers: &HeaderMap, body: Bytes) -> Response {
    // A missing header verifies as the empty string, which cannot match a
    // real signature.
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Until start() stores the resolved hostname this is empty, so early
    // deliveries fail verification. Expected: Trello has nothing to deliver
    // before registration completes.
    let hostname = state.hostname();

    if !verify_signature(&body, hostname, signature, state.client_secret()) {
        warn!("Trello signature verification failed");
        return StatusCode::BAD_REQUEST.into_response();
    }

    debug!(bytes = body.len(), "verified Trello webhook delivery");

    // Respond 200 immediately; parsing and handler work happen in their own
    // task so a slow subscriber never backs up the listener.
    let handlers = state.data_handlers();
    tokio::spawn(async move {
        let event: Value = match serde_json::from_slice(&body) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "verified payload is not valid JSON; dropping");
                return;
            }
        };
        dispatch(&handlers, event).await;
    });

    StatusCode::OK.into_response()
}

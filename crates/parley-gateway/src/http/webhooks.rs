//! Rocket.Chat outgoing-webhook ingress: POST /webhooks/rocketchat.
//!
//! The request is acknowledged immediately; each message is handled on its
//! own task so a slow completion never blocks the webhook sender.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use parley_bridge::EventOutcome;

use crate::app::AppState;
use crate::rocketchat::OutgoingWebhook;

/// POST /webhooks/rocketchat
///
/// Returns 200 + receipt ID once the event is queued, 401 when the shared
/// token does not match.
pub async fn rocketchat_webhook(
    State(state): State<Arc<AppState>>,
    Json(push): Json<OutgoingWebhook>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let expected = state
        .config
        .rocketchat
        .as_ref()
        .and_then(|rc| rc.webhook_token.as_deref());
    if let Err(reason) = verify_token(expected, push.token.as_deref()) {
        warn!(reason, message = %push.message_id, "webhook authentication failed");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "authentication failed", "reason": reason})),
        ));
    }

    let receipt_id = uuid::Uuid::new_v4().to_string();
    info!(receipt_id = %receipt_id, message = %push.message_id, "webhook accepted");

    tokio::spawn(process_push(state, push));

    Ok(Json(json!({"ok": true, "receipt_id": receipt_id})))
}

async fn process_push(state: Arc<AppState>, push: OutgoingWebhook) {
    let event = match state.host.event_from_push(&push).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!(message = %push.message_id, "unsupported room, ignoring");
            return;
        }
        Err(e) => {
            warn!(message = %push.message_id, error = %e, "failed to resolve webhook event");
            return;
        }
    };

    match state.bridge.handle(event).await {
        Ok(EventOutcome::Ignored) => {}
        Ok(outcome) => debug!(message = %push.message_id, ?outcome, "event handled"),
        Err(e) => warn!(message = %push.message_id, error = %e, "event failed"),
    }
}

/// Compare the payload token with the configured one. No configured token
/// means the endpoint is open.
fn verify_token(expected: Option<&str>, presented: Option<&str>) -> Result<(), &'static str> {
    match (expected, presented) {
        (None, _) => Ok(()),
        (Some(_), None) => Err("missing token"),
        (Some(want), Some(got)) if want == got => Ok(()),
        (Some(_), Some(_)) => Err("token mismatch"),
    }
}

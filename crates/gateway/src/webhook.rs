//! Feishu event callback endpoint.

use {
    axum::{
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    serde_json::{Value, json},
    tracing::{debug, info, warn},
};

use ferry_feishu::{CallbackEnvelope, MESSAGE_RECEIVE_V1, MessageReceiveEvent};

use crate::server::AppState;

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /webhook`.
///
/// URL-verification handshakes are answered before the token check; every
/// other callback must carry the configured verification token. Message
/// events are relayed inline before the acknowledgment is returned.
pub async fn webhook_handler(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    if let Some(challenge) = body.get("challenge") {
        info!("answering URL verification challenge");
        return Json(json!({ "challenge": challenge })).into_response();
    }

    let envelope: CallbackEnvelope = match serde_json::from_value(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("malformed callback body: {e}");
            return error_response(StatusCode::BAD_REQUEST, "Malformed callback");
        },
    };

    if envelope.token() != Some(state.gateway.verification_token()) {
        warn!(
            event_id = envelope.event_id().unwrap_or_default(),
            "rejecting callback with invalid verification token"
        );
        return error_response(StatusCode::FORBIDDEN, "Invalid token");
    }

    let event_type = envelope.event_type().unwrap_or_default();
    let event_id = envelope.event_id().unwrap_or_default();

    if event_type == MESSAGE_RECEIVE_V1 {
        let event = match envelope.event.clone() {
            Some(value) => MessageReceiveEvent::from_value(value),
            None => Ok(MessageReceiveEvent::default()),
        };
        match event {
            Ok(event) => {
                let outcome = state.gateway.relay.handle_message(&event).await;
                debug!(event_id, ?outcome, "message event handled");
            },
            Err(e) => warn!(event_id, "undecodable message event: {e}"),
        }
    } else {
        debug!(event_id, event_type, "ignoring unhandled event type");
    }

    Json(json!({ "success": true })).into_response()
}

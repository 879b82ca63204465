// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the bidirectional event surface.
//!
//! Client -> Server frames (JSON):
//! ```json
//! {"event": "support:request", "data": {"clientName": "Ana", "brand": "Samsung"}}
//! {"event": "session:chat:send", "id": 7, "data": {"sessionId": "AB12CD", "text": "hi"}}
//! ```
//!
//! Server -> Client frames (JSON):
//! ```json
//! {"event": "support:enqueued", "data": {"requestId": "XK93PF"}}
//! {"event": "ack", "reqId": 7, "data": {"ok": true, "id": "..."}}
//! {"event": "session:chat:new", "data": { ...message... }}
//! ```
//!
//! Acknowledged events (`session:join`, `session:chat:send`,
//! `session:command`, `session:telemetry`) echo the caller's `id` back as
//! `reqId` so consoles can correlate.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use atendo_core::types::Sender;
use atendo_core::AtendoError;
use atendo_hub::{frame, JoinRoom, JoinSession, NewRequest};

use crate::server::GatewayState;

/// Inbound event-tagged frame.
#[derive(Debug, Deserialize)]
struct WsFrame {
    event: String,
    /// Caller correlation id, echoed back in acks.
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    data: Value,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
///
/// Registers the connection with the presence tracker, spawns a sender task
/// forwarding relay frames to the socket, and dispatches inbound frames
/// until the peer goes away. Disconnect cleanup (queue purge, peer-left)
/// runs unconditionally on exit.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::channel::<String>(64);
    state.relay.presence().on_connect(&connection_id, tx);
    tracing::debug!(connection_id, "websocket connected");

    let sender_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let inbound: WsFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(connection_id, "invalid websocket frame: {e}");
                        continue;
                    }
                };
                if let Some(reply) = dispatch(&state, &connection_id, inbound).await {
                    state.relay.presence().send_to(&connection_id, reply).await;
                }
            }
            Message::Close(_) => break,
            _ => {} // Binary and ping/pong are not part of the protocol.
        }
    }

    state.relay.handle_disconnect(&connection_id).await;
    sender_task.abort();
    tracing::debug!(connection_id, "websocket disconnected");
}

/// Route one inbound frame, returning the reply frame if the event has one.
async fn dispatch(state: &GatewayState, connection_id: &str, inbound: WsFrame) -> Option<String> {
    match inbound.event.as_str() {
        "support:request" => {
            let payload: NewRequest = match serde_json::from_value(inbound.data) {
                Ok(payload) => payload,
                Err(e) => {
                    return Some(frame("support:error", &json!({ "error": e.to_string() })))
                }
            };
            match state
                .relay
                .handle_support_request(connection_id, payload)
                .await
            {
                Ok(request) => Some(frame(
                    "support:enqueued",
                    &json!({ "requestId": request.id }),
                )),
                Err(e) => Some(frame("support:error", &json!({ "error": e.to_string() }))),
            }
        }
        "join" => {
            let payload: JoinRoom = serde_json::from_value(inbound.data).ok()?;
            state.relay.handle_join(connection_id, payload).await;
            None
        }
        "signal" => {
            let room = inbound.data.get("room")?.as_str()?.to_string();
            let data = inbound.data.get("data").cloned().unwrap_or(Value::Null);
            state.relay.handle_signal(connection_id, &room, data).await;
            None
        }
        "session:join" => {
            let result = match serde_json::from_value::<JoinSession>(inbound.data) {
                Ok(payload) => state.relay.handle_session_join(connection_id, payload).await,
                Err(e) => Err(AtendoError::BadPayload(e.to_string())),
            };
            Some(match result {
                Ok(status) => ack(inbound.id, json!({ "ok": true, "status": status })),
                Err(e) => nack(inbound.id, &e),
            })
        }
        "session:chat:send" => {
            let result = match split_session_payload(inbound.data) {
                Ok((session_id, data)) => match serde_json::from_value(data) {
                    Ok(draft) => {
                        state
                            .relay
                            .handle_chat(connection_id, &session_id, draft)
                            .await
                    }
                    Err(e) => Err(AtendoError::BadPayload(e.to_string())),
                },
                Err(e) => Err(e),
            };
            Some(match result {
                Ok(message) => ack(inbound.id, json!({ "ok": true, "id": message.id })),
                Err(e) => nack(inbound.id, &e),
            })
        }
        "session:command" => {
            let result = match split_session_payload(inbound.data) {
                Ok((session_id, data)) => match serde_json::from_value(data) {
                    Ok(draft) => {
                        state
                            .relay
                            .handle_command(connection_id, &session_id, draft)
                            .await
                    }
                    Err(e) => Err(AtendoError::BadPayload(e.to_string())),
                },
                Err(e) => Err(e),
            };
            Some(match result {
                Ok(outcome) => ack(inbound.id, json!({ "ok": true, "id": outcome.event.id })),
                Err(e) => nack(inbound.id, &e),
            })
        }
        "session:telemetry" => {
            let result = match split_session_payload(inbound.data) {
                Ok((session_id, envelope)) => {
                    let from = envelope
                        .get("from")
                        .and_then(|v| serde_json::from_value::<Sender>(v.clone()).ok())
                        .unwrap_or_default();
                    let data = envelope.get("data").cloned().unwrap_or(Value::Null);
                    state.relay.handle_telemetry(&session_id, from, data).await
                }
                Err(e) => Err(e),
            };
            Some(match result {
                Ok(_) => ack(inbound.id, json!({ "ok": true })),
                Err(e) => nack(inbound.id, &e),
            })
        }
        "signal:offer" | "signal:answer" | "signal:candidate" => {
            let kind = inbound.event.trim_start_matches("signal:").to_string();
            if let Err(e) = state
                .relay
                .handle_webrtc(connection_id, &kind, inbound.data)
                .await
            {
                tracing::debug!(connection_id, error = %e, "signaling frame dropped");
            }
            None
        }
        other => {
            tracing::warn!(connection_id, event = other, "unknown websocket event");
            None
        }
    }
}

/// Pull the mandatory sessionId out of an acknowledged payload.
fn split_session_payload(data: Value) -> Result<(String, Value), AtendoError> {
    let session_id = data
        .get("sessionId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AtendoError::BadPayload("sessionId is required".into()))?
        .to_string();
    Ok((session_id, data))
}

fn ack(req_id: Option<Value>, data: Value) -> String {
    json!({ "event": "ack", "reqId": req_id, "data": data }).to_string()
}

fn nack(req_id: Option<Value>, err: &AtendoError) -> String {
    ack(req_id, json!({ "ok": false, "err": err.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_session_payload_requires_an_id() {
        let (id, data) =
            split_session_payload(json!({ "sessionId": "AB12CD", "text": "hi" })).unwrap();
        assert_eq!(id, "AB12CD");
        assert_eq!(data["text"], "hi");

        assert!(split_session_payload(json!({ "text": "hi" })).is_err());
        assert!(split_session_payload(json!({ "sessionId": "" })).is_err());
    }

    #[test]
    fn acks_echo_the_correlation_id() {
        let reply = ack(Some(json!(7)), json!({ "ok": true }));
        let value: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["event"], "ack");
        assert_eq!(value["reqId"], 7);
        assert_eq!(value["data"]["ok"], true);
    }
}

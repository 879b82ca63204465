// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay router: inbound real-time events to rooms and peers.
//!
//! Each handler validates through the queue manager or session engine
//! (which persist first), then fans out to the session room. Fan-out is
//! fire-and-forget; a persistence failure aborts before anything is
//! emitted, so peers never see an effect the store does not have.
//!
//! The event pump is the other half: it subscribes to the domain-event bus
//! and translates hub events into wire frames for observers, decoupling
//! "what changed" from "who gets told".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use atendo_core::types::{ChatMessage, Sender, SessionEvent, SessionStatus, SupportRequest};
use atendo_core::AtendoError;

use crate::engine::{CommandDraft, CommandOutcome, MessageDraft, SessionEngine};
use crate::events::{EventBus, HubEvent};
use crate::presence::PresenceTracker;
use crate::queue::{NewRequest, RequestQueue};

/// Serialize an event-tagged wire frame.
pub fn frame<T: Serialize>(event: &str, data: &T) -> String {
    serde_json::json!({ "event": event, "data": data }).to_string()
}

/// Inbound `session:join` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    pub session_id: String,
    #[serde(default)]
    pub user_type: Option<Sender>,
}

/// Inbound legacy `join` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoom {
    pub room: String,
    #[serde(default)]
    pub role: Option<Sender>,
}

/// Routes real-time traffic between connections, rooms, and the engine.
pub struct RelayRouter {
    queue: Arc<RequestQueue>,
    engine: Arc<SessionEngine>,
    presence: Arc<PresenceTracker>,
    bus: EventBus,
}

impl RelayRouter {
    pub fn new(
        queue: Arc<RequestQueue>,
        engine: Arc<SessionEngine>,
        presence: Arc<PresenceTracker>,
        bus: EventBus,
    ) -> Self {
        Self {
            queue,
            engine,
            presence,
            bus,
        }
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// `support:request`: mark the connection as a client and enqueue.
    pub async fn handle_support_request(
        &self,
        connection_id: &str,
        payload: NewRequest,
    ) -> Result<SupportRequest, AtendoError> {
        self.presence.mark_role(connection_id, Sender::Client);
        self.queue.enqueue(connection_id, payload).await
    }

    /// `session:join`: verify the session, join its room, announce the peer.
    ///
    /// Rejoining by the same connection is a no-op success. Joining a closed
    /// session succeeds too; the returned status lets the console render a
    /// read-only view.
    pub async fn handle_session_join(
        &self,
        connection_id: &str,
        payload: JoinSession,
    ) -> Result<SessionStatus, AtendoError> {
        let session = self.engine.get(&payload.session_id).await?;
        let role = payload.user_type.unwrap_or_default();
        let newly_joined = self
            .presence
            .join_session(connection_id, &payload.session_id, role)?;
        if newly_joined {
            let announce = frame("peer-joined", &serde_json::json!({ "role": role }));
            self.relay_to_room(&payload.session_id, Some(connection_id), &announce)
                .await;
        }
        Ok(session.status)
    }

    /// `session:chat:send`: persist, then relay to the other occupants.
    pub async fn handle_chat(
        &self,
        connection_id: &str,
        session_id: &str,
        draft: MessageDraft,
    ) -> Result<ChatMessage, AtendoError> {
        let message = self.engine.record_message(session_id, draft).await?;
        let payload = frame("session:chat:new", &message);
        self.relay_to_room(session_id, Some(connection_id), &payload)
            .await;
        Ok(message)
    }

    /// `session:command`: normalize, persist, relay. An `end` transition is
    /// announced only after the command frame has been pushed to the room,
    /// so peers always see the final command before `session:ended`.
    pub async fn handle_command(
        &self,
        connection_id: &str,
        session_id: &str,
        draft: CommandDraft,
    ) -> Result<CommandOutcome, AtendoError> {
        let outcome = self.engine.apply_command(session_id, draft).await?;
        let payload = frame("session:command", &outcome.event);
        self.relay_to_room(session_id, Some(connection_id), &payload)
            .await;
        if outcome.ended {
            self.bus.publish(HubEvent::SessionEnded {
                session_id: session_id.to_string(),
                reason: "command".to_string(),
            });
        }
        Ok(outcome)
    }

    /// `session:telemetry`: merge into the session, then send a compact
    /// status notification to the room. The full snapshot reaches global
    /// observers through the bus.
    pub async fn handle_telemetry(
        &self,
        session_id: &str,
        from: Sender,
        data: Value,
    ) -> Result<SessionEvent, AtendoError> {
        let Value::Object(map) = data else {
            return Err(AtendoError::BadPayload(
                "telemetry data must be an object".into(),
            ));
        };
        let event = self.engine.record_telemetry(session_id, map, from).await?;
        let status = frame(
            "session:status",
            &serde_json::json!({
                "sessionId": session_id,
                "from": from,
                "data": event.data,
                "ts": event.ts,
            }),
        );
        self.relay_to_room(session_id, None, &status).await;
        Ok(event)
    }

    /// `signal:offer` / `signal:answer` / `signal:candidate`: stateless
    /// pass-through to the room, minus the sender. Nothing is persisted or
    /// interpreted beyond the session id.
    pub async fn handle_webrtc(
        &self,
        connection_id: &str,
        kind: &str,
        payload: Value,
    ) -> Result<(), AtendoError> {
        let session_id = payload
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| AtendoError::BadPayload("signaling requires sessionId".into()))?
            .to_string();
        let wire = frame(&format!("signal:{kind}"), &payload);
        self.relay_to_room(&session_id, Some(connection_id), &wire)
            .await;
        Ok(())
    }

    /// Legacy `join`: session-agnostic room membership.
    pub async fn handle_join(&self, connection_id: &str, payload: JoinRoom) {
        let role = payload.role.unwrap_or_default();
        if self.presence.join_room(&payload.room, connection_id) {
            let announce = frame("peer-joined", &serde_json::json!({ "role": role }));
            self.relay_to_room(&payload.room, Some(connection_id), &announce)
                .await;
        }
    }

    /// Legacy `signal`: opaque broadcast to the room, minus the sender.
    pub async fn handle_signal(&self, connection_id: &str, room: &str, data: Value) {
        let wire = frame("signal", &data);
        self.relay_to_room(room, Some(connection_id), &wire).await;
    }

    /// Transport disconnect: purge queued requests owned by a client and
    /// tell remaining room occupants the peer is gone.
    pub async fn handle_disconnect(&self, connection_id: &str) {
        let Some(outcome) = self.presence.on_disconnect(connection_id) else {
            return;
        };
        if outcome.record.role == Sender::Client {
            if let Err(e) = self.queue.purge_for_connection(connection_id).await {
                warn!(connection_id, error = %e, "queue purge on disconnect failed");
            }
        }
        let announce = frame(
            "peer-left",
            &serde_json::json!({ "role": outcome.record.role }),
        );
        for room in outcome.rooms {
            self.relay_to_room(&room, None, &announce).await;
        }
    }

    /// Translate domain events into wire frames until cancelled.
    pub fn spawn_event_pump(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let router = Arc::clone(self);
        let mut rx = router.bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(event) => router.dispatch(event).await,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event pump lagged, observers may miss updates");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("event pump stopped");
        })
    }

    async fn dispatch(&self, event: HubEvent) {
        match event {
            HubEvent::QueueUpdated {
                request_id,
                state,
                session_id,
                ..
            } => {
                let wire = frame(
                    "queue:updated",
                    &serde_json::json!({
                        "requestId": request_id,
                        "state": state,
                        "sessionId": session_id,
                    }),
                );
                self.presence.broadcast_all(&wire).await;
                metrics::counter!("atendo_frames_relayed_total").increment(1);
            }
            HubEvent::SessionUpdated { snapshot } => {
                let wire = frame("session:updated", snapshot.as_ref());
                self.presence.broadcast_all(&wire).await;
                metrics::counter!("atendo_frames_relayed_total").increment(1);
            }
            HubEvent::SessionEnded { session_id, reason } => {
                let wire = frame(
                    "session:ended",
                    &serde_json::json!({ "sessionId": session_id, "reason": reason }),
                );
                self.relay_to_room(&session_id, None, &wire).await;
                let evicted = self.presence.drop_room(&session_id);
                debug!(session_id, evicted = evicted.len(), "session room destroyed");
            }
        }
    }

    async fn relay_to_room(&self, room: &str, except: Option<&str>, payload: &str) {
        self.presence.broadcast_room(room, except, payload).await;
        metrics::counter!("atendo_frames_relayed_total").increment(1);
    }
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state engine.
//!
//! Owns the authoritative state of active and closed sessions: creation on
//! accept, command application with derived telemetry flags, chat and
//! telemetry recording, closure, and the flattened snapshot projection.
//! Every mutation persists through the store before any event is published,
//! so pollers reading the store are never stale relative to what peers saw.
//!
//! The session state machine is `active -> closed`, once. A closed session
//! keeps accepting events into its append-only logs but its status never
//! changes again.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use atendo_core::command::CommandType;
use atendo_core::ids::{short_code, MAX_CODE_ATTEMPTS};
use atendo_core::types::{
    now_ms, ChatMessage, CloseReport, EventKind, MessageKind, Sender, Session, SessionEvent,
    SessionSnapshot, SessionStatus, SupportRequest, TechInfo,
};
use atendo_core::{AtendoError, SessionStore};

use crate::events::{EventBus, HubEvent};

/// Outcome recorded when an `end` command closes a session and the caller
/// supplied no explicit outcome.
const DEFAULT_END_OUTCOME: &str = "completed";

/// Telemetry keys surfaced as top-level snapshot convenience fields.
const SNAPSHOT_TELEMETRY_KEYS: [&str; 4] = ["network", "health", "permissions", "alerts"];

/// Inbound `session:chat:send` payload (sessionId stripped by the router).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageDraft {
    pub id: Option<String>,
    pub from: Option<Sender>,
    #[serde(rename = "type")]
    pub kind: Option<MessageKind>,
    pub text: Option<String>,
    pub audio_url: Option<String>,
    pub image_url: Option<String>,
    pub file_url: Option<String>,
    pub status: Option<String>,
    pub ts: Option<i64>,
}

impl MessageDraft {
    /// A message must carry something a console can render.
    fn renderable(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
            || self.audio_url.is_some()
            || self.image_url.is_some()
            || self.file_url.is_some()
    }

    /// Content kind, inferred from the populated field when unspecified.
    fn resolved_kind(&self) -> MessageKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        if self.audio_url.is_some() {
            MessageKind::Audio
        } else if self.image_url.is_some() {
            MessageKind::Image
        } else if self.file_url.is_some() {
            MessageKind::File
        } else {
            MessageKind::Text
        }
    }
}

/// Inbound `session:command` payload (sessionId stripped by the router).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandDraft {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub raw_type: String,
    pub by: Option<Sender>,
    pub data: Value,
    pub ts: Option<i64>,
}

/// Result of applying a command: the persisted event, the normalized
/// command, and the session as it stands afterwards.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub event: SessionEvent,
    pub command: CommandType,
    pub session: Session,
    /// True when this command transitioned the session to closed.
    pub ended: bool,
}

/// Authoritative engine for session lifecycle and derived state.
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    bus: EventBus,
}

impl SessionEngine {
    pub fn new(store: Arc<dyn SessionStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    /// Build and persist a session from an accepted request.
    ///
    /// Computes `wait_time_ms` immediately and copies forward the request's
    /// context fields. A `telemetry` object inside the request's `extra` map
    /// seeds the session telemetry.
    pub async fn create(
        &self,
        request: &SupportRequest,
        tech: TechInfo,
    ) -> Result<Session, AtendoError> {
        let id = self.fresh_session_code().await?;
        let accepted_at = now_ms();
        let telemetry = match request.extra.get("telemetry") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let session = Session {
            id,
            request_id: request.id.clone(),
            client_connection_id: request.client_connection_id.clone(),
            client_name: request.client_name.clone(),
            client_uid: request.client_uid.clone(),
            tech_name: tech.tech_name,
            tech_id: tech.tech_id,
            tech_uid: tech.tech_uid,
            brand: request.brand.clone(),
            model: request.model.clone(),
            os_version: request.os_version.clone(),
            plan: request.plan.clone(),
            issue: request.issue.clone(),
            requested_at: request.created_at,
            accepted_at,
            wait_time_ms: (accepted_at - request.created_at).max(0),
            status: SessionStatus::Active,
            closed_at: None,
            handle_time_ms: None,
            outcome: None,
            symptom: None,
            solution: None,
            notes: None,
            first_contact_resolution: None,
            nps_score: None,
            telemetry,
            last_message_at: None,
            last_command: None,
            updated_at: accepted_at,
        };
        self.store.create_session(&session).await?;
        info!(session_id = %session.id, request_id = %session.request_id, "session created");
        self.publish_updated(&session);
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Session, AtendoError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| AtendoError::session_not_found(session_id))
    }

    /// Normalize and apply a command.
    ///
    /// The event is always appended, even on a closed session. Derived
    /// telemetry flags and the `end` transition only apply while the session
    /// is active; a closed session is never reopened or otherwise mutated.
    ///
    /// A terminal transition is reported through `CommandOutcome::ended`
    /// rather than published here, so the caller can relay the final command
    /// frame to the room before `session:ended` goes out.
    pub async fn apply_command(
        &self,
        session_id: &str,
        draft: CommandDraft,
    ) -> Result<CommandOutcome, AtendoError> {
        if draft.raw_type.is_empty() {
            return Err(AtendoError::BadPayload("command type is required".into()));
        }
        let mut session = self.get(session_id).await?;
        let command = CommandType::normalize(&draft.raw_type);
        let event = SessionEvent {
            id: draft.id.unwrap_or_else(new_event_id),
            session_id: session_id.to_string(),
            kind: EventKind::Command,
            raw_type: draft.raw_type,
            event_type: command.as_str().to_string(),
            data: draft.data,
            by: draft.by.unwrap_or_default(),
            ts: draft.ts.unwrap_or_else(now_ms),
        };
        self.store.append_event(&event).await?;

        let mut ended = false;
        if session.status == SessionStatus::Active {
            for (key, value) in command.telemetry_effect() {
                session
                    .telemetry
                    .insert((*key).to_string(), Value::Bool(*value));
            }
            session.last_command = Some(command.as_str().to_string());
            session.updated_at = now_ms();
            if command.is_end() {
                let closed_at = now_ms();
                session.status = SessionStatus::Closed;
                session.closed_at = Some(closed_at);
                session.handle_time_ms = Some((closed_at - session.accepted_at).max(0));
                if session.outcome.is_none() {
                    session.outcome = Some(DEFAULT_END_OUTCOME.to_string());
                }
                ended = true;
            }
            self.store.update_session(&session).await?;
        }

        self.publish_updated(&session);
        if ended {
            info!(session_id, "session ended by command");
        }
        Ok(CommandOutcome {
            event,
            command,
            session,
            ended,
        })
    }

    /// Validate, persist, and index a chat message.
    pub async fn record_message(
        &self,
        session_id: &str,
        draft: MessageDraft,
    ) -> Result<ChatMessage, AtendoError> {
        if !draft.renderable() {
            return Err(AtendoError::BadPayload(
                "message has no renderable content".into(),
            ));
        }
        let mut session = self.get(session_id).await?;
        let message = ChatMessage {
            id: draft.id.clone().unwrap_or_else(new_event_id),
            session_id: session_id.to_string(),
            from: draft.from.unwrap_or_default(),
            kind: draft.resolved_kind(),
            text: draft.text,
            audio_url: draft.audio_url,
            image_url: draft.image_url,
            file_url: draft.file_url,
            status: draft.status,
            ts: draft.ts.unwrap_or_else(now_ms),
        };
        self.store.append_message(&message).await?;

        session.last_message_at = Some(message.ts);
        session.updated_at = now_ms();
        self.store.update_session(&session).await?;
        self.publish_updated(&session);
        Ok(message)
    }

    /// Merge telemetry fields into the session and persist an audit event.
    /// Later writes for the same key overwrite earlier ones.
    pub async fn record_telemetry(
        &self,
        session_id: &str,
        data: Map<String, Value>,
        by: Sender,
    ) -> Result<SessionEvent, AtendoError> {
        let mut session = self.get(session_id).await?;
        let event = SessionEvent {
            id: new_event_id(),
            session_id: session_id.to_string(),
            kind: EventKind::Telemetry,
            raw_type: "telemetry".to_string(),
            event_type: "telemetry".to_string(),
            data: Value::Object(data.clone()),
            by,
            ts: now_ms(),
        };
        self.store.append_event(&event).await?;

        for (key, value) in data {
            session.telemetry.insert(key, value);
        }
        session.updated_at = now_ms();
        self.store.update_session(&session).await?;
        self.publish_updated(&session);
        Ok(event)
    }

    /// Close a session with caller-supplied outcome fields.
    ///
    /// The raw NPS answer is rounded half away from zero and clamped to
    /// [0, 10]. Closing an already-closed session is a conflict.
    pub async fn close(
        &self,
        session_id: &str,
        report: CloseReport,
    ) -> Result<Session, AtendoError> {
        let mut session = self.get(session_id).await?;
        if session.status == SessionStatus::Closed {
            return Err(AtendoError::AlreadyClosed {
                session_id: session_id.to_string(),
            });
        }
        let closed_at = now_ms();
        session.status = SessionStatus::Closed;
        session.closed_at = Some(closed_at);
        session.handle_time_ms = Some((closed_at - session.accepted_at).max(0));
        if report.outcome.is_some() {
            session.outcome = report.outcome;
        }
        if report.symptom.is_some() {
            session.symptom = report.symptom;
        }
        if report.solution.is_some() {
            session.solution = report.solution;
        }
        if report.notes.is_some() {
            session.notes = report.notes;
        }
        if report.first_contact_resolution.is_some() {
            session.first_contact_resolution = report.first_contact_resolution;
        }
        if let Some(raw) = report.nps_score {
            session.nps_score = Some((raw.round() as i64).clamp(0, 10));
        }
        session.updated_at = closed_at;
        self.store.update_session(&session).await?;

        info!(session_id, outcome = ?session.outcome, "session closed");
        self.publish_updated(&session);
        self.bus.publish(HubEvent::SessionEnded {
            session_id: session_id.to_string(),
            reason: "closed".to_string(),
        });
        Ok(session)
    }

    /// Flattened consumer view of a session, optionally with its ordered logs.
    pub async fn snapshot(
        &self,
        session_id: &str,
        include_logs: bool,
    ) -> Result<SessionSnapshot, AtendoError> {
        let session = self.get(session_id).await?;
        if !include_logs {
            return Ok(project(session));
        }
        let messages = self.store.list_messages(session_id).await?;
        let events = self.store.list_events(session_id).await?;
        let mut snapshot = project(session);
        snapshot.messages = Some(messages);
        snapshot.events = Some(events);
        Ok(snapshot)
    }

    /// Snapshots for a batch of sessions (no logs).
    pub fn project_all(&self, sessions: Vec<Session>) -> Vec<SessionSnapshot> {
        sessions.into_iter().map(project).collect()
    }

    fn publish_updated(&self, session: &Session) {
        self.bus.publish(HubEvent::SessionUpdated {
            snapshot: Arc::new(project(session.clone())),
        });
    }

    async fn fresh_session_code(&self) -> Result<String, AtendoError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = short_code();
            if self.store.get_session(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AtendoError::Internal(
            "exhausted session code attempts".to_string(),
        ))
    }
}

fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Project a session into its snapshot shape, lifting the well-known
/// telemetry sub-structures to top-level convenience fields.
fn project(session: Session) -> SessionSnapshot {
    let [network, health, permissions, alerts] =
        SNAPSHOT_TELEMETRY_KEYS.map(|key| session.telemetry.get(key).cloned());
    SessionSnapshot {
        session,
        messages: None,
        events: None,
        network,
        health,
        permissions,
        alerts,
    }
}

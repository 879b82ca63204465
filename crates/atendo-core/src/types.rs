// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for the Atendo support hub.
//!
//! Wire payloads and persisted documents both use camelCase field names, so
//! every entity here derives serde with `rename_all = "camelCase"`. Free-form
//! `extra` and `telemetry` sub-structures stay open-ended as JSON maps while
//! known command/event kinds are modeled as enums (see [`crate::command`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Epoch milliseconds, the timestamp unit used across all entities.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Lifecycle state of a support request.
///
/// A request transitions queued -> accepted or queued -> removed exactly
/// once; both terminal states are not re-enterable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestState {
    Queued,
    Accepted,
    Removed,
}

/// A client's pending ask for support, alive only while unaccepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    /// Short, human-shareable request code.
    pub id: String,
    /// Transport-level connection the request arrived on.
    pub client_connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    /// Free-form auxiliary fields supplied by the client console.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    pub created_at: i64,
    pub state: RequestState,
}

/// Technician identity supplied on accept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_uid: Option<String>,
}

/// Lifecycle status of a session. `Closed` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
}

/// The durable record of one accepted support engagement, from acceptance to
/// closure. Created atomically with request deletion on accept; never
/// physically deleted (message/event sub-logs are append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Short, human-shareable session code.
    pub id: String,
    /// Request this session originated from.
    pub request_id: String,
    pub client_connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    /// When the originating request was enqueued.
    pub requested_at: i64,
    /// When the technician accepted.
    pub accepted_at: i64,
    /// accepted_at - requested_at, always non-negative.
    pub wait_time_ms: i64,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    /// closed_at - accepted_at, computed on close, always non-negative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contact_resolution: Option<bool>,
    /// Net Promoter Score answer, clamped to [0, 10] on close.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps_score: Option<i64>,
    /// Merged telemetry map: derived activity flags plus free-form
    /// network/health/permissions/alerts sub-structures.
    #[serde(default)]
    pub telemetry: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<i64>,
    /// Normalized type of the most recent command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_command: Option<String>,
    pub updated_at: i64,
}

/// Who sent a message or event within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    Client,
    Tech,
    Unknown,
}

impl Default for Sender {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Renderable content kind of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    Text,
    Audio,
    Image,
    File,
}

/// A chat message within a session. Immutable once stored; ordered by `ts`
/// ascending with ties broken by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub from: Sender,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub ts: i64,
}

/// Audit kind of a session event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Command,
    Telemetry,
}

/// An append-only session event: a control-plane command or a telemetry
/// merge, kept for audit and timeline reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub id: String,
    pub session_id: String,
    pub kind: EventKind,
    /// The type string exactly as received.
    pub raw_type: String,
    /// Canonical type after alias normalization.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque payload; the hub never interprets it beyond normalization.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    pub by: Sender,
    pub ts: i64,
}

/// Caller-supplied closure fields for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Raw NPS answer; rounded and clamped to [0, 10] by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nps_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contact_resolution: Option<bool>,
}

/// Transient record of a live transport connection. Never persisted;
/// destroyed on disconnect.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub connection_id: String,
    pub role: Sender,
    pub session_id: Option<String>,
}

/// The flattened, consumer-ready projection of a session, optionally with its
/// full ordered message/event history and telemetry convenience sub-fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: Session,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<SessionEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Value>,
}

/// Derived operational statistics over a window of session history.
///
/// Averages and percentages are `None` when no qualifying data exists,
/// never fabricated zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Sessions whose accepted_at (fallback requested_at) falls in the window.
    pub sessions_today: u64,
    pub active_sessions: u64,
    pub avg_wait_ms: Option<i64>,
    pub avg_handle_ms: Option<i64>,
    /// First-contact-resolution percentage, rounded to nearest integer.
    pub fcr_percent: Option<i64>,
    /// round(((promoters - detractors) / total) * 100); promoters >= 9,
    /// detractors <= 6.
    pub nps: Option<i64>,
    pub queue_size: u64,
}

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is fully operational.
    Healthy,
    /// Store is operational but experiencing issues.
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn request_state_round_trips_through_strings() {
        for state in [
            RequestState::Queued,
            RequestState::Accepted,
            RequestState::Removed,
        ] {
            let s = state.to_string();
            assert_eq!(RequestState::from_str(&s).unwrap(), state);
        }
        assert_eq!(RequestState::Queued.to_string(), "queued");
    }

    #[test]
    fn session_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
        let json = serde_json::to_string(&SessionStatus::Closed).unwrap();
        assert_eq!(json, "\"closed\"");
    }

    #[test]
    fn support_request_uses_camel_case_wire_names() {
        let req = SupportRequest {
            id: "REQ123".into(),
            client_connection_id: "conn-1".into(),
            client_name: Some("Ana".into()),
            client_uid: None,
            brand: Some("Samsung".into()),
            model: Some("A54".into()),
            os_version: None,
            plan: None,
            issue: None,
            extra: Map::new(),
            created_at: 1_700_000_000_000,
            state: RequestState::Queued,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["clientName"], "Ana");
        assert_eq!(json["createdAt"], 1_700_000_000_000i64);
        assert_eq!(json["state"], "queued");
        assert!(json.get("clientUid").is_none(), "None fields are omitted");
    }

    #[test]
    fn chat_message_type_field_is_renamed() {
        let msg = ChatMessage {
            id: "m1".into(),
            session_id: "S1".into(),
            from: Sender::Client,
            kind: MessageKind::Text,
            text: Some("hello".into()),
            audio_url: None,
            image_url: None,
            file_url: None,
            status: None,
            ts: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["from"], "client");
    }

    #[test]
    fn close_report_deserializes_partial_payload() {
        let report: CloseReport =
            serde_json::from_str(r#"{"outcome":"resolved","npsScore":12}"#).unwrap();
        assert_eq!(report.outcome.as_deref(), Some("resolved"));
        assert_eq!(report.nps_score, Some(12.0));
        assert!(report.symptom.is_none());
    }

    #[test]
    fn snapshot_flattens_session_fields() {
        let session = Session {
            id: "S1".into(),
            request_id: "R1".into(),
            client_connection_id: "c".into(),
            client_name: Some("Ana".into()),
            client_uid: None,
            tech_name: Some("Bruno".into()),
            tech_id: None,
            tech_uid: None,
            brand: None,
            model: None,
            os_version: None,
            plan: None,
            issue: None,
            requested_at: 10,
            accepted_at: 15,
            wait_time_ms: 5,
            status: SessionStatus::Active,
            closed_at: None,
            handle_time_ms: None,
            outcome: None,
            symptom: None,
            solution: None,
            notes: None,
            first_contact_resolution: None,
            nps_score: None,
            telemetry: Map::new(),
            last_message_at: None,
            last_command: None,
            updated_at: 15,
        };
        let snap = SessionSnapshot {
            session,
            messages: None,
            events: None,
            network: None,
            health: None,
            permissions: None,
            alerts: None,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["id"], "S1");
        assert_eq!(json["techName"], "Bruno");
        assert_eq!(json["waitTimeMs"], 5);
        assert!(json.get("messages").is_none());
    }
}

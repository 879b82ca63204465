// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait: the durable document collaborator.
//!
//! The hub owns lifecycle and derived state; the store owns nothing but
//! bytes. Two top-level collections (`requests`, `sessions`) plus two ordered
//! per-session sub-logs (`messages`, `events`). Implementations must return
//! sub-log reads sorted by `ts` ascending regardless of physical order.

use async_trait::async_trait;

use crate::error::AtendoError;
use crate::types::{
    ChatMessage, HealthStatus, RequestState, Session, SessionEvent, SessionStatus,
    SupportRequest,
};

/// Filter for session history queries.
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    /// Maximum rows to return (callers cap this; the gateway uses 500).
    pub limit: Option<usize>,
    /// Inclusive lower bound on accepted_at (epoch millis).
    pub start: Option<i64>,
    /// Inclusive upper bound on accepted_at (epoch millis).
    pub end: Option<i64>,
    /// Match tech_id or tech_uid.
    pub tech: Option<String>,
    pub status: Option<SessionStatus>,
}

/// Abstract document store for requests, sessions, and their sub-logs.
///
/// The queue manager's exactly-once accept guarantee rests on
/// [`take_queued_request`](SessionStore::take_queued_request): a conditional
/// delete-if-still-queued that at most one concurrent caller can win.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Prepare the backend (migrations, connections). Idempotent per instance.
    async fn initialize(&self) -> Result<(), AtendoError>;

    /// Liveness/dependency probe for `/health`.
    async fn health_check(&self) -> Result<HealthStatus, AtendoError>;

    /// Flush and release resources.
    async fn close(&self) -> Result<(), AtendoError>;

    // --- Request collection ---

    /// Insert a request. Fails if the id already exists.
    async fn put_request(&self, request: &SupportRequest) -> Result<(), AtendoError>;

    async fn get_request(&self, id: &str) -> Result<Option<SupportRequest>, AtendoError>;

    /// Requests matching the optional state filter, created_at ascending
    /// (FIFO fairness), ties broken by id.
    async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<SupportRequest>, AtendoError>;

    /// Atomically remove and return the request iff it is still `queued`.
    ///
    /// Returns `None` when the request is absent or no longer queued. Under
    /// concurrent calls for the same id, at most one caller receives the row.
    async fn take_queued_request(
        &self,
        id: &str,
    ) -> Result<Option<SupportRequest>, AtendoError>;

    /// Remove a request unconditionally. Returns the removed row if any
    /// (idempotent: removing a missing request is not an error).
    async fn delete_request(&self, id: &str) -> Result<Option<SupportRequest>, AtendoError>;

    // --- Session collection ---

    /// Insert a session. Fails if the id already exists.
    async fn create_session(&self, session: &Session) -> Result<(), AtendoError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, AtendoError>;

    /// Replace the stored session document (whole-document write; the hub
    /// serializes writes per session id).
    async fn update_session(&self, session: &Session) -> Result<(), AtendoError>;

    /// Sessions matching the filter, accepted_at descending (newest first).
    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, AtendoError>;

    // --- Ordered sub-logs ---

    /// Append to the session's message log.
    async fn append_message(&self, message: &ChatMessage) -> Result<(), AtendoError>;

    /// Messages for a session, ts ascending, ties by insertion order.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, AtendoError>;

    /// Append to the session's event log.
    async fn append_event(&self, event: &SessionEvent) -> Result<(), AtendoError>;

    /// Events for a session, ts ascending, ties by insertion order.
    async fn list_events(&self, session_id: &str) -> Result<Vec<SessionEvent>, AtendoError>;
}

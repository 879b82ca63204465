// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory SessionStore for tests and ephemeral deployments.
//!
//! Mirrors the SQLite adapter's semantics: same ordering guarantees, same
//! conditional-take behavior, nothing survives a restart.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use atendo_core::traits::{SessionQuery, SessionStore};
use atendo_core::types::{
    ChatMessage, HealthStatus, RequestState, Session, SessionEvent, SupportRequest,
};
use atendo_core::AtendoError;

/// Sub-log rows carry an arrival index so equal timestamps keep insertion order.
#[derive(Clone)]
struct Stamped<T> {
    seq: u64,
    value: T,
}

/// Volatile store backed by concurrent hash maps.
#[derive(Default)]
pub struct MemoryStore {
    requests: DashMap<String, Stamped<SupportRequest>>,
    sessions: DashMap<String, Session>,
    messages: DashMap<String, Vec<Stamped<ChatMessage>>>,
    events: DashMap<String, Vec<Stamped<SessionEvent>>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn initialize(&self) -> Result<(), AtendoError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), AtendoError> {
        Ok(())
    }

    async fn put_request(&self, request: &SupportRequest) -> Result<(), AtendoError> {
        let stamped = Stamped {
            seq: self.seq(),
            value: request.clone(),
        };
        if self.requests.contains_key(&request.id) {
            return Err(AtendoError::Store {
                source: format!("request {} already exists", request.id).into(),
            });
        }
        self.requests.insert(request.id.clone(), stamped);
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<SupportRequest>, AtendoError> {
        Ok(self.requests.get(id).map(|entry| entry.value.clone()))
    }

    async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<SupportRequest>, AtendoError> {
        let mut rows: Vec<Stamped<SupportRequest>> = self
            .requests
            .iter()
            .filter(|entry| state.is_none_or(|s| entry.value.state == s))
            .map(|entry| entry.clone())
            .collect();
        rows.sort_by_key(|r| (r.value.created_at, r.seq));
        Ok(rows.into_iter().map(|r| r.value).collect())
    }

    async fn take_queued_request(
        &self,
        id: &str,
    ) -> Result<Option<SupportRequest>, AtendoError> {
        // remove_if holds the shard lock, so two concurrent takes cannot
        // both observe the queued state.
        Ok(self
            .requests
            .remove_if(id, |_, stamped| stamped.value.state == RequestState::Queued)
            .map(|(_, stamped)| stamped.value))
    }

    async fn delete_request(&self, id: &str) -> Result<Option<SupportRequest>, AtendoError> {
        Ok(self.requests.remove(id).map(|(_, stamped)| stamped.value))
    }

    async fn create_session(&self, session: &Session) -> Result<(), AtendoError> {
        if self.sessions.contains_key(&session.id) {
            return Err(AtendoError::Store {
                source: format!("session {} already exists", session.id).into(),
            });
        }
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, AtendoError> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn update_session(&self, session: &Session) -> Result<(), AtendoError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, AtendoError> {
        let mut rows: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| {
                let s = entry.value();
                query.start.is_none_or(|start| s.accepted_at >= start)
                    && query.end.is_none_or(|end| s.accepted_at <= end)
                    && query.status.is_none_or(|status| s.status == status)
                    && query.tech.as_deref().is_none_or(|tech| {
                        s.tech_id.as_deref() == Some(tech) || s.tech_uid.as_deref() == Some(tech)
                    })
            })
            .map(|entry| entry.clone())
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.accepted_at));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), AtendoError> {
        let stamped = Stamped {
            seq: self.seq(),
            value: message.clone(),
        };
        self.messages
            .entry(message.session_id.clone())
            .or_default()
            .push(stamped);
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, AtendoError> {
        let mut rows = self
            .messages
            .get(session_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        rows.sort_by_key(|m| (m.value.ts, m.seq));
        Ok(rows.into_iter().map(|m| m.value).collect())
    }

    async fn append_event(&self, event: &SessionEvent) -> Result<(), AtendoError> {
        let stamped = Stamped {
            seq: self.seq(),
            value: event.clone(),
        };
        self.events
            .entry(event.session_id.clone())
            .or_default()
            .push(stamped);
        Ok(())
    }

    async fn list_events(&self, session_id: &str) -> Result<Vec<SessionEvent>, AtendoError> {
        let mut rows = self
            .events
            .get(session_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        rows.sort_by_key(|e| (e.value.ts, e.seq));
        Ok(rows.into_iter().map(|e| e.value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atendo_core::types::{now_ms, MessageKind, Sender};
    use serde_json::Map;

    fn make_request(id: &str, created_at: i64) -> SupportRequest {
        SupportRequest {
            id: id.to_string(),
            client_connection_id: "conn-1".to_string(),
            client_name: None,
            client_uid: None,
            brand: None,
            model: None,
            os_version: None,
            plan: None,
            issue: None,
            extra: Map::new(),
            created_at,
            state: RequestState::Queued,
        }
    }

    #[tokio::test]
    async fn fifo_order_with_equal_timestamps() {
        let store = MemoryStore::new();
        store.put_request(&make_request("FIRST1", 100)).await.unwrap();
        store.put_request(&make_request("TIED_A", 200)).await.unwrap();
        store.put_request(&make_request("TIED_B", 200)).await.unwrap();

        let ids: Vec<String> = store
            .list_requests(Some(RequestState::Queued))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["FIRST1", "TIED_A", "TIED_B"]);
    }

    #[tokio::test]
    async fn take_queued_is_exactly_once() {
        let store = MemoryStore::new();
        store.put_request(&make_request("RACE01", now_ms())).await.unwrap();

        assert!(store.take_queued_request("RACE01").await.unwrap().is_some());
        assert!(store.take_queued_request("RACE01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_request_id_is_rejected() {
        let store = MemoryStore::new();
        store.put_request(&make_request("DUP001", 1)).await.unwrap();
        assert!(store.put_request(&make_request("DUP001", 2)).await.is_err());
    }

    #[tokio::test]
    async fn messages_sort_by_ts_then_arrival() {
        let store = MemoryStore::new();
        let msg = |id: &str, ts: i64| ChatMessage {
            id: id.to_string(),
            session_id: "SES001".to_string(),
            from: Sender::Client,
            kind: MessageKind::Text,
            text: Some("hi".to_string()),
            audio_url: None,
            image_url: None,
            file_url: None,
            status: None,
            ts,
        };
        store.append_message(&msg("late", 300)).await.unwrap();
        store.append_message(&msg("early", 100)).await.unwrap();
        store.append_message(&msg("tie_a", 200)).await.unwrap();
        store.append_message(&msg("tie_b", 200)).await.unwrap();

        let ids: Vec<String> = store
            .list_messages("SES001")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["early", "tie_a", "tie_b", "late"]);
    }
}

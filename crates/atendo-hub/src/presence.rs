// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection and room registry.
//!
//! Maps transport connections to `{role, session}` records and to the rooms
//! they occupy. Nothing here is persisted; a record exists only for the
//! lifetime of its transport connection. Outbound frames are pre-serialized
//! strings pushed through per-connection mpsc senders, so a slow or gone
//! peer never blocks the caller.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use atendo_core::types::{ConnectionRecord, Sender};
use atendo_core::AtendoError;

/// What a disconnect left behind, for the relay to clean up after.
#[derive(Debug)]
pub struct DisconnectOutcome {
    pub record: ConnectionRecord,
    /// Rooms the connection was evicted from, still containing its peers.
    pub rooms: Vec<String>,
}

/// Registry of live connections, their roles, and room memberships.
#[derive(Default)]
pub struct PresenceTracker {
    connections: DashMap<String, ConnectionRecord>,
    senders: DashMap<String, mpsc::Sender<String>>,
    rooms: DashMap<String, Vec<String>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection with unknown role.
    pub fn on_connect(&self, connection_id: &str, sender: mpsc::Sender<String>) {
        self.connections.insert(
            connection_id.to_string(),
            ConnectionRecord {
                connection_id: connection_id.to_string(),
                role: Sender::Unknown,
                session_id: None,
            },
        );
        self.senders.insert(connection_id.to_string(), sender);
        metrics::gauge!("atendo_connections").increment(1.0);
    }

    /// Record the role a connection declared (client on enqueue, tech or
    /// client on session join). Unknown connections are ignored.
    pub fn mark_role(&self, connection_id: &str, role: Sender) {
        if let Some(mut record) = self.connections.get_mut(connection_id) {
            record.role = role;
        }
    }

    pub fn record(&self, connection_id: &str) -> Option<ConnectionRecord> {
        self.connections.get(connection_id).map(|r| r.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Add a connection to a room. Returns false when it was already a
    /// member (idempotent rejoin).
    pub fn join_room(&self, room: &str, connection_id: &str) -> bool {
        let mut members = self.rooms.entry(room.to_string()).or_default();
        if members.iter().any(|m| m == connection_id) {
            return false;
        }
        members.push(connection_id.to_string());
        true
    }

    /// Associate a connection with a session room.
    ///
    /// A connection holds at most one session association; switching
    /// sessions requires an explicit disconnect first, so a join to a
    /// different session while one is held is rejected.
    pub fn join_session(
        &self,
        connection_id: &str,
        session_id: &str,
        role: Sender,
    ) -> Result<bool, AtendoError> {
        {
            let mut record = self.connections.get_mut(connection_id).ok_or_else(|| {
                AtendoError::Channel {
                    message: format!("unknown connection: {connection_id}"),
                    source: None,
                }
            })?;
            match record.session_id.as_deref() {
                Some(current) if current != session_id => {
                    return Err(AtendoError::BadPayload(format!(
                        "connection already joined to session {current}"
                    )));
                }
                _ => {}
            }
            record.role = role;
            record.session_id = Some(session_id.to_string());
        }
        Ok(self.join_room(session_id, connection_id))
    }

    pub fn room_members(&self, room: &str) -> Vec<String> {
        self.rooms
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    /// Remove a room entirely, clearing its members' session associations.
    /// Returns the evicted member ids.
    pub fn drop_room(&self, room: &str) -> Vec<String> {
        let members = self
            .rooms
            .remove(room)
            .map(|(_, members)| members)
            .unwrap_or_default();
        for member in &members {
            if let Some(mut record) = self.connections.get_mut(member) {
                if record.session_id.as_deref() == Some(room) {
                    record.session_id = None;
                }
            }
        }
        members
    }

    /// Deregister a connection and evict it from every room it occupied.
    pub fn on_disconnect(&self, connection_id: &str) -> Option<DisconnectOutcome> {
        let (_, record) = self.connections.remove(connection_id)?;
        self.senders.remove(connection_id);
        metrics::gauge!("atendo_connections").decrement(1.0);

        let mut left_rooms = Vec::new();
        let mut empty_rooms = Vec::new();
        for mut entry in self.rooms.iter_mut() {
            let before = entry.len();
            entry.retain(|m| m != connection_id);
            if entry.len() < before {
                left_rooms.push(entry.key().clone());
            }
            if entry.is_empty() {
                empty_rooms.push(entry.key().clone());
            }
        }
        for room in empty_rooms {
            self.rooms.remove_if(&room, |_, members| members.is_empty());
        }

        debug!(connection_id, rooms = left_rooms.len(), "connection removed");
        Some(DisconnectOutcome {
            record,
            rooms: left_rooms,
        })
    }

    /// Deliver a frame to one connection. Gone or saturated peers are
    /// dropped silently; fan-out is fire-and-forget.
    pub async fn send_to(&self, connection_id: &str, payload: String) {
        let sender = self.senders.get(connection_id).map(|s| s.clone());
        if let Some(sender) = sender {
            if sender.send(payload).await.is_err() {
                debug!(connection_id, "dropping frame for closed connection");
            }
        }
    }

    /// Deliver a frame to every room member except `except`.
    pub async fn broadcast_room(&self, room: &str, except: Option<&str>, payload: &str) {
        let targets: Vec<mpsc::Sender<String>> = self
            .rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| except != Some(m.as_str()))
                    .filter_map(|m| self.senders.get(m).map(|s| s.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for sender in targets {
            let _ = sender.send(payload.to_string()).await;
        }
    }

    /// Deliver a frame to every live connection.
    pub async fn broadcast_all(&self, payload: &str) {
        let targets: Vec<mpsc::Sender<String>> =
            self.senders.iter().map(|entry| entry.clone()).collect();
        for sender in targets {
            let _ = sender.send(payload.to_string()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(tracker: &PresenceTracker, id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        tracker.on_connect(id, tx);
        rx
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let tracker = PresenceTracker::new();
        let _rx = connect(&tracker, "c1");
        assert!(tracker.join_session("c1", "SES001", Sender::Client).unwrap());
        assert!(!tracker.join_session("c1", "SES001", Sender::Client).unwrap());
        assert_eq!(tracker.room_members("SES001"), vec!["c1"]);
    }

    #[tokio::test]
    async fn second_session_join_requires_leaving_first() {
        let tracker = PresenceTracker::new();
        let _rx = connect(&tracker, "c1");
        tracker.join_session("c1", "SES001", Sender::Tech).unwrap();
        let err = tracker.join_session("c1", "SES002", Sender::Tech);
        assert!(matches!(err, Err(AtendoError::BadPayload(_))));
    }

    #[tokio::test]
    async fn broadcast_room_skips_sender() {
        let tracker = PresenceTracker::new();
        let mut rx1 = connect(&tracker, "c1");
        let mut rx2 = connect(&tracker, "c2");
        tracker.join_room("room", "c1");
        tracker.join_room("room", "c2");

        tracker.broadcast_room("room", Some("c1"), "hello").await;
        assert_eq!(rx2.recv().await.unwrap(), "hello");
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_reports_rooms_and_clears_state() {
        let tracker = PresenceTracker::new();
        let _rx1 = connect(&tracker, "c1");
        let _rx2 = connect(&tracker, "c2");
        tracker.join_session("c1", "SES001", Sender::Client).unwrap();
        tracker.join_session("c2", "SES001", Sender::Tech).unwrap();

        let outcome = tracker.on_disconnect("c1").unwrap();
        assert_eq!(outcome.record.role, Sender::Client);
        assert_eq!(outcome.rooms, vec!["SES001".to_string()]);
        assert_eq!(tracker.room_members("SES001"), vec!["c2"]);
        assert!(tracker.record("c1").is_none());
        assert!(tracker.on_disconnect("c1").is_none());
    }

    #[tokio::test]
    async fn drop_room_evicts_and_clears_associations() {
        let tracker = PresenceTracker::new();
        let _rx1 = connect(&tracker, "c1");
        let _rx2 = connect(&tracker, "c2");
        tracker.join_session("c1", "SES001", Sender::Client).unwrap();
        tracker.join_session("c2", "SES001", Sender::Tech).unwrap();

        let evicted = tracker.drop_room("SES001");
        assert_eq!(evicted.len(), 2);
        assert!(tracker.room_members("SES001").is_empty());
        assert!(tracker.record("c1").unwrap().session_id.is_none());
        // After eviction the connection may join a new session.
        assert!(tracker.join_session("c1", "SES002", Sender::Client).unwrap());
    }
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed domain-event broadcast.
//!
//! The queue manager and session engine announce *what changed* here; the
//! relay router subscribes and decides *who gets told* on the wire. State
//! mutations never depend on delivery: publishing to a bus with no
//! subscribers is a successful no-op.

use std::sync::Arc;

use tokio::sync::broadcast;

use atendo_core::types::{RequestState, SessionSnapshot};

/// Events emitted by the hub after a state change has been persisted.
#[derive(Debug, Clone)]
pub enum HubEvent {
    /// A request entered, left, or moved through the queue.
    QueueUpdated {
        request_id: String,
        state: RequestState,
        /// Present when the transition was an accept.
        session_id: Option<String>,
        /// The client connection that owns the request, when still known.
        client_connection_id: Option<String>,
    },
    /// A session document changed; carries the fresh snapshot (no logs).
    SessionUpdated { snapshot: Arc<SessionSnapshot> },
    /// A session reached its terminal state; the room must be torn down.
    SessionEnded { session_id: String, reason: String },
}

/// Broadcast bus for [`HubEvent`]s.
///
/// Cheap to clone; all clones publish into the same channel. Slow
/// subscribers lag and skip rather than backpressure publishers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HubEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A closed or empty channel is not an error.
    pub fn publish(&self, event: HubEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

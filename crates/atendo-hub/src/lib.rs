// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core engine of the Atendo remote-support hub.
//!
//! Wires the request queue, session state engine, relay router, presence
//! tracker, and metrics aggregator around a shared [`EventBus`]. Every
//! state-changing path persists through the injected `SessionStore` before
//! any broadcast, and announces itself as a typed [`HubEvent`] that the
//! relay translates into wire frames.

pub mod engine;
pub mod events;
pub mod metrics;
pub mod presence;
pub mod queue;
pub mod relay;

pub use engine::{CommandDraft, CommandOutcome, MessageDraft, SessionEngine};
pub use events::{EventBus, HubEvent};
pub use metrics::compute_metrics;
pub use presence::PresenceTracker;
pub use queue::{NewRequest, RequestQueue};
pub use relay::{frame, JoinRoom, JoinSession, RelayRouter};

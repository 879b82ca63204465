// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Atendo remote-support hub.
//!
//! This crate provides the domain model, error taxonomy, command
//! normalization table, short-code generator, and the `SessionStore` trait
//! implemented by storage backends. It contains no I/O of its own.

pub mod command;
pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use command::CommandType;
pub use error::AtendoError;
pub use traits::{SessionQuery, SessionStore};
pub use types::{
    ChatMessage, CloseReport, ConnectionRecord, EventKind, HealthStatus, MessageKind,
    MetricsSnapshot, RequestState, Sender, Session, SessionEvent, SessionSnapshot,
    SessionStatus, SupportRequest, TechInfo,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_covers_the_contract() {
        // One constructor per caller-facing failure class.
        let _bad = AtendoError::BadPayload("no content".into());
        let _missing = AtendoError::session_not_found("S1");
        let _taken = AtendoError::NotFoundOrTaken {
            request_id: "R1".into(),
        };
        let _closed = AtendoError::AlreadyClosed {
            session_id: "S1".into(),
        };
        let _store = AtendoError::store(std::io::Error::other("down"));
        let _internal = AtendoError::Internal("bug".into());
    }

    #[test]
    fn store_trait_is_object_safe() {
        fn _assert(_store: &dyn SessionStore) {}
    }
}

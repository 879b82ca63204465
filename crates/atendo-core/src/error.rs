// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atendo support hub.

use thiserror::Error;

/// The primary error type used across the Atendo hub, stores, and gateway.
///
/// The first four variants form the caller-facing taxonomy: validation,
/// missing/conflicting entities, and queue-accept races. `Store` covers the
/// durable collaborator being unreachable; operations depending on it fail
/// closed rather than degrade to stale data.
#[derive(Debug, Error)]
pub enum AtendoError {
    /// Malformed or incomplete input (missing session id, empty chat message).
    /// No state mutation occurs.
    #[error("bad payload: {0}")]
    BadPayload(String),

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The support request does not exist in state `queued` -- it was never
    /// created, already accepted by another technician, or removed.
    #[error("request not found or already taken: {request_id}")]
    NotFoundOrTaken { request_id: String },

    /// The session is already closed; closing a closed session is rejected.
    #[error("session already closed: {session_id}")]
    AlreadyClosed { session_id: String },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/gateway errors (bind failure, send to a gone connection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AtendoError {
    /// Wrap any error as a `Store` error.
    pub fn store<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            source: Box::new(source),
        }
    }

    /// Shorthand for a session-not-found error.
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "session",
            id: id.into(),
        }
    }
}

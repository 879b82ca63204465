// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session message sub-log operations (append-only).

use atendo_core::types::ChatMessage;
use atendo_core::AtendoError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_doc;

/// Append a message to the session's log.
pub async fn append_message(db: &Database, message: &ChatMessage) -> Result<(), AtendoError> {
    let doc = serde_json::to_string(message).map_err(AtendoError::store)?;
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, ts, doc) VALUES (?1, ?2, ?3, ?4)",
                params![message.id, message.session_id, message.ts, doc],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages for a session, ts ascending, ties broken by insertion order.
///
/// The ORDER BY matters: under concurrent writers the physical insert order
/// is not guaranteed to match logical time.
pub async fn list_messages(
    db: &Database,
    session_id: &str,
) -> Result<Vec<ChatMessage>, AtendoError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT doc FROM messages WHERE session_id = ?1 ORDER BY ts ASC, seq ASC",
            )?;
            let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(parse_doc(row?)?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

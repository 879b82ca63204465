// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session event sub-log operations (append-only).

use atendo_core::types::SessionEvent;
use atendo_core::AtendoError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_doc;

/// Append an event to the session's audit log.
pub async fn append_event(db: &Database, event: &SessionEvent) -> Result<(), AtendoError> {
    let doc = serde_json::to_string(event).map_err(AtendoError::store)?;
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO events (id, session_id, ts, doc) VALUES (?1, ?2, ?3, ?4)",
                params![event.id, event.session_id, event.ts, doc],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Events for a session, ts ascending, ties broken by insertion order.
pub async fn list_events(
    db: &Database,
    session_id: &str,
) -> Result<Vec<SessionEvent>, AtendoError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare("SELECT doc FROM events WHERE session_id = ?1 ORDER BY ts ASC, seq ASC")?;
            let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;
            let mut events = Vec::new();
            for row in rows {
                events.push(parse_doc(row?)?);
            }
            Ok(events)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atendo_core::types::{EventKind, Sender};
    use tempfile::tempdir;

    fn make_event(id: &str, ts: i64, event_type: &str) -> SessionEvent {
        SessionEvent {
            id: id.to_string(),
            session_id: "SES001".to_string(),
            kind: EventKind::Command,
            raw_type: event_type.to_string(),
            event_type: event_type.to_string(),
            data: serde_json::Value::Null,
            by: Sender::Tech,
            ts,
        }
    }

    #[tokio::test]
    async fn events_read_back_in_timeline_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        append_event(&db, &make_event("e2", 200, "share_start"))
            .await
            .unwrap();
        append_event(&db, &make_event("e1", 100, "call_start"))
            .await
            .unwrap();

        let events = list_events(&db, "SES001").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "e1");
        assert_eq!(events[1].event_type, "share_start");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_session_has_empty_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        assert!(list_events(&db, "NOPE").await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}

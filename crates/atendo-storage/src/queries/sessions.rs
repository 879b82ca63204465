// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session collection operations.

use atendo_core::traits::SessionQuery;
use atendo_core::types::Session;
use atendo_core::AtendoError;
use rusqlite::{params, types::Value};

use crate::database::{map_tr_err, Database};
use crate::queries::parse_doc;

/// Insert a session. Fails if the id already exists.
pub async fn create_session(db: &Database, session: &Session) -> Result<(), AtendoError> {
    let doc = serde_json::to_string(session).map_err(AtendoError::store)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, status, accepted_at, tech_id, tech_uid, doc)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.id,
                    session.status.to_string(),
                    session.accepted_at,
                    session.tech_id,
                    session.tech_uid,
                    doc,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by id.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, AtendoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT doc FROM sessions WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(doc) => Ok(Some(parse_doc(doc)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the stored session document and its extracted columns.
pub async fn update_session(db: &Database, session: &Session) -> Result<(), AtendoError> {
    let doc = serde_json::to_string(session).map_err(AtendoError::store)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions SET status = ?1, accepted_at = ?2, tech_id = ?3,
                 tech_uid = ?4, doc = ?5 WHERE id = ?6",
                params![
                    session.status.to_string(),
                    session.accepted_at,
                    session.tech_id,
                    session.tech_uid,
                    doc,
                    session.id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List sessions matching the filter, accepted_at descending.
pub async fn list_sessions(
    db: &Database,
    query: &SessionQuery,
) -> Result<Vec<Session>, AtendoError> {
    let query = query.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT doc FROM sessions");
            let mut clauses: Vec<&str> = Vec::new();
            let mut args: Vec<Value> = Vec::new();

            if let Some(start) = query.start {
                clauses.push("accepted_at >= ?");
                args.push(Value::Integer(start));
            }
            if let Some(end) = query.end {
                clauses.push("accepted_at <= ?");
                args.push(Value::Integer(end));
            }
            if let Some(status) = query.status {
                clauses.push("status = ?");
                args.push(Value::Text(status.to_string()));
            }
            if let Some(ref tech) = query.tech {
                clauses.push("(tech_id = ? OR tech_uid = ?)");
                args.push(Value::Text(tech.clone()));
                args.push(Value::Text(tech.clone()));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY accepted_at DESC");
            if let Some(limit) = query.limit {
                sql.push_str(" LIMIT ?");
                args.push(Value::Integer(limit as i64));
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows =
                stmt.query_map(rusqlite::params_from_iter(args), |row| row.get::<_, String>(0))?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(parse_doc(row?)?);
            }
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atendo_core::types::SessionStatus;
    use serde_json::Map;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn make_session(id: &str, accepted_at: i64) -> Session {
        Session {
            id: id.to_string(),
            request_id: "REQ001".to_string(),
            client_connection_id: "conn-1".to_string(),
            client_name: Some("Ana".to_string()),
            client_uid: None,
            tech_name: Some("Bruno".to_string()),
            tech_id: Some("t-1".to_string()),
            tech_uid: None,
            brand: None,
            model: None,
            os_version: None,
            plan: None,
            issue: None,
            requested_at: accepted_at - 500,
            accepted_at,
            wait_time_ms: 500,
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
            updated_at: accepted_at,
        }
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("SES001", 1000))
            .await
            .unwrap();
        let got = get_session(&db, "SES001").await.unwrap().unwrap();
        assert_eq!(got.tech_name.as_deref(), Some("Bruno"));
        assert_eq!(got.wait_time_ms, 500);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_session(&db, "NOPE").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_replaces_document() {
        let (db, _dir) = setup_db().await;
        let mut session = make_session("SES002", 2000);
        create_session(&db, &session).await.unwrap();

        session.status = SessionStatus::Closed;
        session.closed_at = Some(3000);
        session.handle_time_ms = Some(1000);
        update_session(&db, &session).await.unwrap();

        let got = get_session(&db, "SES002").await.unwrap().unwrap();
        assert_eq!(got.status, SessionStatus::Closed);
        assert_eq!(got.handle_time_ms, Some(1000));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("OLD001", 1000))
            .await
            .unwrap();
        create_session(&db, &make_session("NEW001", 3000))
            .await
            .unwrap();
        let mut closed = make_session("MID001", 2000);
        closed.status = SessionStatus::Closed;
        create_session(&db, &closed).await.unwrap();

        let all = list_sessions(&db, &SessionQuery::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["NEW001", "MID001", "OLD001"]);

        let active = list_sessions(
            &db,
            &SessionQuery {
                status: Some(SessionStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 2);

        let windowed = list_sessions(
            &db,
            &SessionQuery {
                start: Some(1500),
                end: Some(2500),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].id, "MID001");

        let limited = list_sessions(
            &db,
            &SessionQuery {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(limited.len(), 2);

        let by_tech = list_sessions(
            &db,
            &SessionQuery {
                tech: Some("t-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_tech.len(), 3);
        db.close().await.unwrap();
    }
}

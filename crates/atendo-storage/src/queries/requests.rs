// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support-request collection operations.
//!
//! `take_queued` is the concurrency primitive behind exactly-once accept:
//! a conditional read-then-delete executed as one closure on the single
//! writer thread, so no two accepts can both observe `state = 'queued'`.

use atendo_core::types::{RequestState, SupportRequest};
use atendo_core::AtendoError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_doc;

/// Insert a request. Fails if the id already exists.
pub async fn put_request(db: &Database, request: &SupportRequest) -> Result<(), AtendoError> {
    let doc = serde_json::to_string(request).map_err(AtendoError::store)?;
    let request = request.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO requests (id, client_connection_id, state, created_at, doc)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    request.id,
                    request.client_connection_id,
                    request.state.to_string(),
                    request.created_at,
                    doc,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a request by id.
pub async fn get_request(db: &Database, id: &str) -> Result<Option<SupportRequest>, AtendoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT doc FROM requests WHERE id = ?1",
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

/// List requests, optionally filtered by state, created_at ascending with
/// ties broken by insertion order.
pub async fn list_requests(
    db: &Database,
    state: Option<RequestState>,
) -> Result<Vec<SupportRequest>, AtendoError> {
    db.connection()
        .call(move |conn| {
            let mut requests = Vec::new();
            match state {
                Some(filter) => {
                    let mut stmt = conn.prepare(
                        "SELECT doc FROM requests WHERE state = ?1
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    let rows =
                        stmt.query_map(params![filter.to_string()], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        requests.push(parse_doc(row?)?);
                    }
                }
                None => {
                    let mut stmt = conn
                        .prepare("SELECT doc FROM requests ORDER BY created_at ASC, rowid ASC")?;
                    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        requests.push(parse_doc(row?)?);
                    }
                }
            }
            Ok(requests)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically remove and return the request iff it is still `queued`.
pub async fn take_queued(db: &Database, id: &str) -> Result<Option<SupportRequest>, AtendoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT doc FROM requests WHERE id = ?1 AND state = 'queued'",
                params![id],
                |row| row.get::<_, String>(0),
            );
            let doc = match result {
                Ok(doc) => doc,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e),
            };
            let deleted = conn.execute(
                "DELETE FROM requests WHERE id = ?1 AND state = 'queued'",
                params![id],
            )?;
            if deleted == 1 {
                Ok(Some(parse_doc(doc)?))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a request unconditionally, returning the removed row if any.
pub async fn delete_request(
    db: &Database,
    id: &str,
) -> Result<Option<SupportRequest>, AtendoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT doc FROM requests WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            );
            let doc = match result {
                Ok(doc) => doc,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e),
            };
            conn.execute("DELETE FROM requests WHERE id = ?1", params![id])?;
            Ok(Some(parse_doc(doc)?))
        })
        .await
        .map_err(map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on the document collections.
//!
//! Each collection stores the full entity as a JSON `doc` column; extracted
//! columns exist only for filtering and ordering. Serialization happens
//! outside the connection closure, deserialization inside it.

pub mod events;
pub mod messages;
pub mod requests;
pub mod sessions;

use serde::de::DeserializeOwned;

/// Parse a JSON document column back into its entity type.
pub(crate) fn parse_doc<T: DeserializeOwned>(doc: String) -> Result<T, rusqlite::Error> {
    serde_json::from_str(&doc).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

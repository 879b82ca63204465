// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Atendo support hub.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Documents are
//! stored whole as JSON alongside extracted index columns, so the schema
//! only knows about the fields we filter and sort on. A volatile
//! [`MemoryStore`] with identical semantics backs tests and ephemeral
//! deployments.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
pub use memory::MemoryStore;

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by pluggable backends.

pub mod store;

pub use store::{SessionQuery, SessionStore};

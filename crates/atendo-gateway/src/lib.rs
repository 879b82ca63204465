// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket gateway for the Atendo hub.
//!
//! Exposes the request-queue and session REST API under `/api`, the duplex
//! event surface on `/ws`, and health/Prometheus probes. All state lives in
//! the hub crates; the gateway only translates between HTTP/WS and the
//! relay router.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{start_server, GatewayState, HealthState, ServerConfig};

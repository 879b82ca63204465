// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use atendo_core::{AtendoError, SessionStore};
use atendo_hub::{RelayRouter, RequestQueue, SessionEngine};

use crate::handlers;
use crate::ws;

/// State for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<RelayRouter>,
    pub queue: Arc<RequestQueue>,
    pub engine: Arc<SessionEngine>,
    pub store: Arc<dyn SessionStore>,
    /// Upper bound on `GET /api/sessions` result size.
    pub session_list_cap: usize,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors ServerConfig from atendo-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Start the gateway HTTP/WebSocket server.
///
/// Serves the REST API under `/api`, the duplex event surface on `/ws`, and
/// unauthenticated probes on `/health`, `/healthz`, and `/metrics`. Shuts
/// down gracefully when the cancellation token fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), AtendoError> {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/healthz", get(handlers::get_health))
        .route("/metrics", get(handlers::get_prometheus_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/requests", get(handlers::get_requests))
        .route("/api/requests/{id}/accept", post(handlers::post_accept))
        .route("/api/requests/{id}", delete(handlers::delete_request))
        .route("/api/sessions", get(handlers::get_sessions))
        .route("/api/sessions/{id}/close", post(handlers::post_close))
        .route("/api/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AtendoError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| AtendoError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atendo_hub::{EventBus, PresenceTracker};
    use atendo_storage::MemoryStore;

    #[test]
    fn gateway_state_is_clone() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let bus = EventBus::default();
        let engine = Arc::new(SessionEngine::new(Arc::clone(&store), bus.clone()));
        let queue = Arc::new(RequestQueue::new(
            Arc::clone(&store),
            Arc::clone(&engine),
            bus.clone(),
        ));
        let relay = Arc::new(RelayRouter::new(
            Arc::clone(&queue),
            Arc::clone(&engine),
            Arc::new(PresenceTracker::new()),
            bus,
        ));
        let state = GatewayState {
            relay,
            queue,
            engine,
            store,
            session_list_cap: 500,
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: None,
            },
        };
        let _cloned = state.clone();
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8321,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atendo serve` command implementation.
//!
//! Wires the SQLite store, the hub engine, and the gateway together, runs
//! the relay event pump, and serves until a shutdown signal arrives.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use atendo_config::model::AtendoConfig;
use atendo_core::types::SessionStatus;
use atendo_core::{AtendoError, SessionQuery, SessionStore};
use atendo_gateway::{GatewayState, HealthState, ServerConfig};
use atendo_hub::{EventBus, PresenceTracker, RelayRouter, RequestQueue, SessionEngine};
use atendo_storage::SqliteStore;

/// Runs the `atendo serve` command.
pub async fn run_serve(config: AtendoConfig) -> Result<(), AtendoError> {
    init_tracing(&config.hub.log_level);
    info!(hub = %config.hub.name, "starting atendo serve");

    let store: Arc<dyn SessionStore> = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    log_stale_sessions(store.as_ref()).await?;

    let prometheus_render = if config.prometheus.enabled {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| AtendoError::Internal(format!("prometheus recorder: {e}")))?;
        info!("prometheus exporter enabled on /metrics");
        Some(Arc::new(move || handle.render()) as Arc<dyn Fn() -> String + Send + Sync>)
    } else {
        None
    };

    let bus = EventBus::default();
    let engine = Arc::new(SessionEngine::new(Arc::clone(&store), bus.clone()));
    let queue = Arc::new(RequestQueue::new(
        Arc::clone(&store),
        Arc::clone(&engine),
        bus.clone(),
    ));
    let presence = Arc::new(PresenceTracker::new());
    let relay = Arc::new(RelayRouter::new(
        Arc::clone(&queue),
        Arc::clone(&engine),
        presence,
        bus,
    ));

    let cancel = install_signal_handler();
    let pump = relay.spawn_event_pump(cancel.clone());

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let state = GatewayState {
        relay,
        queue,
        engine,
        store: Arc::clone(&store),
        session_list_cap: config.server.session_list_cap,
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
        },
    };

    let result = atendo_gateway::start_server(&server_config, state, cancel.clone()).await;

    cancel.cancel();
    let _ = pump.await;
    store.close().await?;
    info!("atendo serve shutdown complete");
    result
}

/// Cancellation token wired to Ctrl-C.
fn install_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            token.cancel();
        }
    });
    cancel
}

/// Report sessions a previous process left active.
///
/// Closure stays an explicit operation; a crash must not silently resolve
/// engagements, so these are surfaced for operators rather than force-closed.
async fn log_stale_sessions(store: &dyn SessionStore) -> Result<(), AtendoError> {
    let active = store
        .list_sessions(&SessionQuery {
            status: Some(SessionStatus::Active),
            ..Default::default()
        })
        .await?;
    if !active.is_empty() {
        warn!(
            count = active.len(),
            "sessions still active from a previous run"
        );
        for session in &active {
            debug!(session_id = %session.id, accepted_at = session.accepted_at, "stale active session");
        }
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("atendo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles the `/api` request-queue and session endpoints plus the
//! unauthenticated health and Prometheus probes.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use atendo_core::types::{now_ms, HealthStatus, RequestState, TechInfo};
use atendo_core::{AtendoError, CloseReport, SessionQuery, SessionStatus};
use atendo_hub::compute_metrics;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map the error taxonomy onto HTTP statuses.
fn error_status(err: &AtendoError) -> StatusCode {
    match err {
        AtendoError::BadPayload(_) => StatusCode::BAD_REQUEST,
        AtendoError::NotFound { .. } | AtendoError::NotFoundOrTaken { .. } => {
            StatusCode::NOT_FOUND
        }
        AtendoError::AlreadyClosed { .. } => StatusCode::CONFLICT,
        AtendoError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: AtendoError) -> Response {
    let status = error_status(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// Query parameters for GET /api/requests.
#[derive(Debug, Deserialize)]
pub struct RequestsQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /api/requests?status=<state>
///
/// Ordered oldest-first for FIFO queue display.
pub async fn get_requests(
    State(state): State<GatewayState>,
    Query(query): Query<RequestsQuery>,
) -> Response {
    let filter = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => match RequestState::from_str(raw) {
            Ok(state) => Some(state),
            Err(_) => {
                return error_response(AtendoError::BadPayload(format!(
                    "unknown request state: {raw}"
                )))
            }
        },
    };
    match state.queue.list(filter).await {
        Ok(requests) => Json(requests).into_response(),
        Err(e) => error_response(e),
    }
}

/// Response body for POST /api/requests/{id}/accept.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub session_id: String,
}

/// POST /api/requests/{id}/accept
///
/// 404 when the request is unknown or already taken by another technician.
pub async fn post_accept(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Option<Json<TechInfo>>,
) -> Response {
    let tech = body.map(|Json(tech)| tech).unwrap_or_default();
    match state.queue.accept(&id, tech).await {
        Ok(session) => Json(AcceptResponse {
            session_id: session.id,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/requests/{id}
///
/// 204 always: rejecting an unknown request is not an error.
pub async fn delete_request(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.queue.reject(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Query parameters for GET /api/sessions and GET /api/metrics.
#[derive(Debug, Default, Deserialize)]
pub struct SessionsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub tech: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

/// GET /api/sessions?limit=&start=&end=&tech=
///
/// Snapshots without logs, newest-accepted-first, capped by config.
pub async fn get_sessions(
    State(state): State<GatewayState>,
    Query(query): Query<SessionsQuery>,
) -> Response {
    let cap = state.session_list_cap;
    let store_query = SessionQuery {
        limit: Some(query.limit.map_or(cap, |l| l.min(cap))),
        start: query.start,
        end: query.end,
        tech: query.tech,
        status: query.status,
    };
    match state.store.list_sessions(&store_query).await {
        Ok(sessions) => Json(state.engine.project_all(sessions)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/sessions/{id}/close
///
/// 404 when the session does not exist, 409 when it is already closed.
pub async fn post_close(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Option<Json<CloseReport>>,
) -> Response {
    let report = body.map(|Json(report)| report).unwrap_or_default();
    match state.engine.close(&id, report).await {
        Ok(_) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/metrics?tech=&start=&end=
///
/// The window defaults to today (UTC midnight to now) when unspecified.
/// Active count spans all matching sessions regardless of window.
pub async fn get_metrics(
    State(state): State<GatewayState>,
    Query(query): Query<SessionsQuery>,
) -> Response {
    let store_query = SessionQuery {
        tech: query.tech,
        ..Default::default()
    };
    let sessions = match state.store.list_sessions(&store_query).await {
        Ok(sessions) => sessions,
        Err(e) => return error_response(e),
    };
    let queue_size = match state.queue.queue_size().await {
        Ok(size) => size,
        Err(e) => return error_response(e),
    };
    let window_end = query.end.unwrap_or_else(now_ms);
    let window_start = query.start.unwrap_or_else(|| start_of_day(window_end));
    Json(compute_metrics(
        &sessions,
        window_start,
        window_end,
        queue_size,
    ))
    .into_response()
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health and /healthz
///
/// Probes the store; a failed or unhealthy store reports 503.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let uptime_secs = state.health.start_time.elapsed().as_secs();
    let version = env!("CARGO_PKG_VERSION").to_string();
    let (code, status, detail) = match state.store.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok", None),
        Ok(HealthStatus::Degraded(msg)) => (StatusCode::OK, "degraded", Some(msg)),
        Ok(HealthStatus::Unhealthy(msg)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(msg))
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            Some(e.to_string()),
        ),
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version,
            uptime_secs,
            detail,
        }),
    )
        .into_response()
}

/// GET /metrics (Prometheus exposition format).
pub async fn get_prometheus_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter disabled").into_response(),
    }
}

/// UTC midnight of the day containing `ts` (epoch millis).
fn start_of_day(ts: i64) -> i64 {
    match Utc.timestamp_millis_opt(ts).single() {
        Some(dt) => dt
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis())
            .unwrap_or(0),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses_match_the_taxonomy() {
        assert_eq!(
            error_status(&AtendoError::BadPayload("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&AtendoError::session_not_found("S1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&AtendoError::NotFoundOrTaken {
                request_id: "R1".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&AtendoError::AlreadyClosed {
                session_id: "S1".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_status(&AtendoError::store(std::io::Error::other("down"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_status(&AtendoError::Internal("bug".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn start_of_day_truncates_to_utc_midnight() {
        // 2024-01-15T13:45:00Z
        let ts = 1_705_326_300_000;
        let midnight = start_of_day(ts);
        assert_eq!(midnight % 86_400_000, 0);
        assert!(midnight <= ts && ts - midnight < 86_400_000);
    }
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request queue manager.
//!
//! Owns the lifecycle of pending support requests: enqueue, list, accept,
//! reject, and purge-on-disconnect. Every transition is persisted first and
//! then announced on the event bus as [`HubEvent::QueueUpdated`]. Exactly-once
//! accept rests on the store's conditional `take_queued_request`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use atendo_core::ids::{short_code, MAX_CODE_ATTEMPTS};
use atendo_core::types::{now_ms, RequestState, Session, SupportRequest, TechInfo};
use atendo_core::{AtendoError, SessionStore};

use crate::engine::SessionEngine;
use crate::events::{EventBus, HubEvent};

/// Inbound `support:request` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRequest {
    pub client_name: Option<String>,
    pub client_uid: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    pub plan: Option<String>,
    pub issue: Option<String>,
    pub extra: Map<String, Value>,
}

/// FIFO queue of pending support requests.
pub struct RequestQueue {
    store: Arc<dyn SessionStore>,
    engine: Arc<SessionEngine>,
    bus: EventBus,
}

impl RequestQueue {
    pub fn new(store: Arc<dyn SessionStore>, engine: Arc<SessionEngine>, bus: EventBus) -> Self {
        Self { store, engine, bus }
    }

    /// Create a queued request from a client payload and announce it.
    pub async fn enqueue(
        &self,
        client_connection_id: &str,
        payload: NewRequest,
    ) -> Result<SupportRequest, AtendoError> {
        let id = self.fresh_request_code().await?;
        let request = SupportRequest {
            id: id.clone(),
            client_connection_id: client_connection_id.to_string(),
            client_name: payload.client_name,
            client_uid: payload.client_uid,
            brand: payload.brand,
            model: payload.model,
            os_version: payload.os_version,
            plan: payload.plan,
            issue: payload.issue,
            extra: payload.extra,
            created_at: now_ms(),
            state: RequestState::Queued,
        };
        self.store.put_request(&request).await?;
        info!(request_id = %id, "support request enqueued");
        self.bus.publish(HubEvent::QueueUpdated {
            request_id: id,
            state: RequestState::Queued,
            session_id: None,
            client_connection_id: Some(request.client_connection_id.clone()),
        });
        Ok(request)
    }

    /// Requests matching the optional state filter, oldest first.
    pub async fn list(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<SupportRequest>, AtendoError> {
        self.store.list_requests(state).await
    }

    pub async fn queue_size(&self) -> Result<u64, AtendoError> {
        Ok(self.list(Some(RequestState::Queued)).await?.len() as u64)
    }

    /// Accept a queued request: atomically take it, create the session, and
    /// announce the transition.
    ///
    /// Under concurrent accepts for the same id only one caller wins; the
    /// rest observe [`AtendoError::NotFoundOrTaken`]. There is no window in
    /// which both the request and the session are live, nor one in which
    /// neither is: the conditional take removes the request, and a failed
    /// session insert re-queues the taken request before the error surfaces.
    pub async fn accept(&self, request_id: &str, tech: TechInfo) -> Result<Session, AtendoError> {
        let request = self
            .store
            .take_queued_request(request_id)
            .await?
            .ok_or_else(|| AtendoError::NotFoundOrTaken {
                request_id: request_id.to_string(),
            })?;
        let session = match self.engine.create(&request, tech).await {
            Ok(session) => session,
            Err(e) => {
                // The taken request still has state `queued`; putting it back
                // restores the pre-accept picture for the next technician.
                if let Err(restore) = self.store.put_request(&request).await {
                    error!(request_id, error = %restore, "failed to re-queue request after accept failure");
                }
                return Err(e);
            }
        };
        info!(request_id, session_id = %session.id, "request accepted");
        self.bus.publish(HubEvent::QueueUpdated {
            request_id: request_id.to_string(),
            state: RequestState::Accepted,
            session_id: Some(session.id.clone()),
            client_connection_id: Some(request.client_connection_id),
        });
        Ok(session)
    }

    /// Remove a request unconditionally. Rejecting an unknown or already
    /// removed id succeeds without announcing anything.
    pub async fn reject(&self, request_id: &str) -> Result<(), AtendoError> {
        let removed = self.store.delete_request(request_id).await?;
        if let Some(request) = removed {
            info!(request_id, "request rejected");
            self.bus.publish(HubEvent::QueueUpdated {
                request_id: request_id.to_string(),
                state: RequestState::Removed,
                session_id: None,
                client_connection_id: Some(request.client_connection_id),
            });
        }
        Ok(())
    }

    /// Drop every queued request owned by a disconnected client, announcing
    /// each removal.
    pub async fn purge_for_connection(&self, connection_id: &str) -> Result<(), AtendoError> {
        let queued = self.store.list_requests(Some(RequestState::Queued)).await?;
        for request in queued
            .into_iter()
            .filter(|r| r.client_connection_id == connection_id)
        {
            if self.store.delete_request(&request.id).await?.is_some() {
                info!(request_id = %request.id, connection_id, "queued request purged on disconnect");
                self.bus.publish(HubEvent::QueueUpdated {
                    request_id: request.id,
                    state: RequestState::Removed,
                    session_id: None,
                    client_connection_id: Some(connection_id.to_string()),
                });
            }
        }
        Ok(())
    }

    async fn fresh_request_code(&self) -> Result<String, AtendoError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = short_code();
            if self.store.get_request(&code).await?.is_none() {
                return Ok(code);
            }
            warn!(code, "request code collision, regenerating");
        }
        Err(AtendoError::Internal(
            "exhausted request code attempts".to_string(),
        ))
    }
}

// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SessionStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use atendo_config::model::StorageConfig;
use atendo_core::traits::{SessionQuery, SessionStore};
use atendo_core::types::{
    ChatMessage, HealthStatus, RequestState, Session, SessionEvent, SupportRequest,
};
use atendo_core::AtendoError;

use crate::database::Database;
use crate::queries;

/// SQLite-backed session store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SessionStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, AtendoError> {
        self.db.get().ok_or_else(|| AtendoError::Store {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn initialize(&self) -> Result<(), AtendoError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| AtendoError::Store {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendoError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), AtendoError> {
        let db = self.db()?;
        db.close().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Request collection ---

    async fn put_request(&self, request: &SupportRequest) -> Result<(), AtendoError> {
        queries::requests::put_request(self.db()?, request).await
    }

    async fn get_request(&self, id: &str) -> Result<Option<SupportRequest>, AtendoError> {
        queries::requests::get_request(self.db()?, id).await
    }

    async fn list_requests(
        &self,
        state: Option<RequestState>,
    ) -> Result<Vec<SupportRequest>, AtendoError> {
        queries::requests::list_requests(self.db()?, state).await
    }

    async fn take_queued_request(
        &self,
        id: &str,
    ) -> Result<Option<SupportRequest>, AtendoError> {
        queries::requests::take_queued(self.db()?, id).await
    }

    async fn delete_request(&self, id: &str) -> Result<Option<SupportRequest>, AtendoError> {
        queries::requests::delete_request(self.db()?, id).await
    }

    // --- Session collection ---

    async fn create_session(&self, session: &Session) -> Result<(), AtendoError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, AtendoError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn update_session(&self, session: &Session) -> Result<(), AtendoError> {
        queries::sessions::update_session(self.db()?, session).await
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, AtendoError> {
        queries::sessions::list_sessions(self.db()?, query).await
    }

    // --- Ordered sub-logs ---

    async fn append_message(&self, message: &ChatMessage) -> Result<(), AtendoError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, AtendoError> {
        queries::messages::list_messages(self.db()?, session_id).await
    }

    async fn append_event(&self, event: &SessionEvent) -> Result<(), AtendoError> {
        queries::events::append_event(self.db()?, event).await
    }

    async fn list_events(&self, session_id: &str) -> Result<Vec<SessionEvent>, AtendoError> {
        queries::events::list_events(self.db()?, session_id).await
    }
}

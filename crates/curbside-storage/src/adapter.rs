// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`StorageAdapter`] implementation over [`Database`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use curbside_config::model::StorageConfig;
use curbside_core::traits::storage::{
    CommitOutcome, CreateOutcome, DispatchRecord, IdempotencyRecord, NewSession, SessionCommit,
};
use curbside_core::{
    AdapterType, CurbsideError, Destination, HealthStatus, LinkingCode, PluginAdapter,
    PurgeStats, QueuedOrder, Session, SessionId, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed store. The database opens on [`StorageAdapter::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already-open database, skipping [`StorageAdapter::initialize`].
    pub fn from_database(database: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: String::new(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(database)),
        }
    }

    fn db(&self) -> Result<&Database, CurbsideError> {
        self.db.get().ok_or_else(|| CurbsideError::Storage {
            source: "storage not initialized; call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CurbsideError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err);
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), CurbsideError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), CurbsideError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CurbsideError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CurbsideError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn upsert_destination(&self, destination: &Destination) -> Result<(), CurbsideError> {
        queries::destinations::upsert_destination(self.db()?, destination).await
    }

    async fn get_destination(&self, id: &str) -> Result<Option<Destination>, CurbsideError> {
        queries::destinations::get_destination(self.db()?, id).await
    }

    async fn create_session(
        &self,
        new_session: &NewSession,
        now: DateTime<Utc>,
    ) -> Result<CreateOutcome, CurbsideError> {
        queries::sessions::create_session(self.db()?, new_session, now).await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CurbsideError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn find_active_session(
        &self,
        actor_id: &str,
        destination_id: &str,
    ) -> Result<Option<Session>, CurbsideError> {
        queries::sessions::find_active(self.db()?, actor_id, destination_id).await
    }

    async fn find_session_by_redemption_code(
        &self,
        code: &str,
    ) -> Result<Option<Session>, CurbsideError> {
        queries::sessions::find_by_redemption_code(self.db()?, code).await
    }

    async fn find_session_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Session>, CurbsideError> {
        queries::sessions::find_by_idempotency_key(self.db()?, key).await
    }

    async fn list_due_sessions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Session>, CurbsideError> {
        queries::sessions::list_due(self.db()?, now, limit).await
    }

    async fn commit(&self, commit: &SessionCommit) -> Result<CommitOutcome, CurbsideError> {
        queries::sessions::commit(self.db()?, commit).await
    }

    async fn get_idempotency_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, CurbsideError> {
        queries::idempotency::get_record(self.db()?, key, now).await
    }

    async fn insert_linking_code(
        &self,
        code: &LinkingCode,
        now: DateTime<Utc>,
    ) -> Result<bool, CurbsideError> {
        queries::linking_codes::insert_linking_code(self.db()?, code, now).await
    }

    async fn get_linking_code(&self, code: &str) -> Result<Option<LinkingCode>, CurbsideError> {
        queries::linking_codes::get_linking_code(self.db()?, code).await
    }

    async fn get_order_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<QueuedOrder>, CurbsideError> {
        queries::orders::get_order_for_session(self.db()?, session_id).await
    }

    async fn list_orders_due_for_dispatch(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueuedOrder>, CurbsideError> {
        queries::orders::list_due_for_dispatch(self.db()?, now, limit).await
    }

    async fn list_orders_awaiting_ready(
        &self,
        limit: usize,
    ) -> Result<Vec<QueuedOrder>, CurbsideError> {
        queries::orders::list_awaiting_ready(self.db()?, limit).await
    }

    async fn record_dispatch(
        &self,
        order_id: &str,
        record: &DispatchRecord,
    ) -> Result<(), CurbsideError> {
        queries::orders::record_dispatch(self.db()?, order_id, record).await
    }

    async fn record_ready_poll(
        &self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CurbsideError> {
        queries::orders::record_ready_poll(self.db()?, order_id, at).await
    }

    async fn mark_order_ready(
        &self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, CurbsideError> {
        queries::orders::mark_ready(self.db()?, order_id, at).await
    }

    async fn purge(
        &self,
        now: DateTime<Utc>,
        code_cutoff: DateTime<Utc>,
    ) -> Result<PurgeStats, CurbsideError> {
        let db = self.db()?;
        Ok(PurgeStats {
            idempotency_records: queries::idempotency::purge_expired(db, now).await?,
            linking_codes: queries::linking_codes::purge_before(db, now, code_cutoff).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_at(path: &std::path::Path) -> SqliteStore {
        SqliteStore::new(StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        })
    }

    #[tokio::test]
    async fn reports_identity() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("id.db"));
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("twice.db"));
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_reflects_initialization() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("health.db"));
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn queries_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("early.db"));
        let err = store.get_destination("x").await.unwrap_err();
        assert!(matches!(err, CurbsideError::Storage { .. }));
    }
}

// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper that injects commit failures.
//!
//! Used to check that a failed write leaves the previous session state
//! authoritative.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use curbside_core::traits::storage::{
    CommitOutcome, CreateOutcome, DispatchRecord, IdempotencyRecord, NewSession, SessionCommit,
};
use curbside_core::{
    AdapterType, CurbsideError, Destination, HealthStatus, LinkingCode, PluginAdapter,
    PurgeStats, QueuedOrder, Session, SessionId, StorageAdapter,
};

/// Delegates to `inner`, except that the next N commits fail with a
/// storage error before reaching it.
pub struct FaultyStore {
    inner: Arc<dyn StorageAdapter>,
    failing_commits: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner,
            failing_commits: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PluginAdapter for FaultyStore {
    fn name(&self) -> &str {
        "faulty-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CurbsideError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), CurbsideError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for FaultyStore {
    async fn initialize(&self) -> Result<(), CurbsideError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), CurbsideError> {
        self.inner.close().await
    }

    async fn upsert_destination(&self, destination: &Destination) -> Result<(), CurbsideError> {
        self.inner.upsert_destination(destination).await
    }

    async fn get_destination(&self, id: &str) -> Result<Option<Destination>, CurbsideError> {
        self.inner.get_destination(id).await
    }

    async fn create_session(
        &self,
        new_session: &NewSession,
        now: DateTime<Utc>,
    ) -> Result<CreateOutcome, CurbsideError> {
        self.inner.create_session(new_session, now).await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CurbsideError> {
        self.inner.get_session(id).await
    }

    async fn find_active_session(
        &self,
        actor_id: &str,
        destination_id: &str,
    ) -> Result<Option<Session>, CurbsideError> {
        self.inner.find_active_session(actor_id, destination_id).await
    }

    async fn find_session_by_redemption_code(
        &self,
        code: &str,
    ) -> Result<Option<Session>, CurbsideError> {
        self.inner.find_session_by_redemption_code(code).await
    }

    async fn find_session_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Session>, CurbsideError> {
        self.inner.find_session_by_idempotency_key(key).await
    }

    async fn list_due_sessions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Session>, CurbsideError> {
        self.inner.list_due_sessions(now, limit).await
    }

    async fn commit(&self, commit: &SessionCommit) -> Result<CommitOutcome, CurbsideError> {
        if self.take_failure() {
            return Err(CurbsideError::Storage {
                source: "injected commit failure".into(),
            });
        }
        self.inner.commit(commit).await
    }

    async fn get_idempotency_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, CurbsideError> {
        self.inner.get_idempotency_record(key, now).await
    }

    async fn insert_linking_code(
        &self,
        code: &LinkingCode,
        now: DateTime<Utc>,
    ) -> Result<bool, CurbsideError> {
        self.inner.insert_linking_code(code, now).await
    }

    async fn get_linking_code(&self, code: &str) -> Result<Option<LinkingCode>, CurbsideError> {
        self.inner.get_linking_code(code).await
    }

    async fn get_order_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<QueuedOrder>, CurbsideError> {
        self.inner.get_order_for_session(session_id).await
    }

    async fn list_orders_due_for_dispatch(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueuedOrder>, CurbsideError> {
        self.inner.list_orders_due_for_dispatch(now, limit).await
    }

    async fn list_orders_awaiting_ready(
        &self,
        limit: usize,
    ) -> Result<Vec<QueuedOrder>, CurbsideError> {
        self.inner.list_orders_awaiting_ready(limit).await
    }

    async fn record_dispatch(
        &self,
        order_id: &str,
        record: &DispatchRecord,
    ) -> Result<(), CurbsideError> {
        self.inner.record_dispatch(order_id, record).await
    }

    async fn record_ready_poll(
        &self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CurbsideError> {
        self.inner.record_ready_poll(order_id, at).await
    }

    async fn mark_order_ready(
        &self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, CurbsideError> {
        self.inner.mark_order_ready(order_id, at).await
    }

    async fn purge(
        &self,
        now: DateTime<Utc>,
        code_cutoff: DateTime<Utc>,
    ) -> Result<PurgeStats, CurbsideError> {
        self.inner.purge(now, code_cutoff).await
    }
}

// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence store trait: atomic read-modify-write over sessions, linking
//! codes, orders and idempotency records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CurbsideError;
use crate::linking::LinkingCode;
use crate::order::{QueuedOrder, ReleasePlan};
use crate::session::{Session, SessionState};
use crate::traits::adapter::PluginAdapter;
use crate::types::{Destination, PurgeStats, SessionId};

/// Durable record of an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub key: String,
    pub session_id: SessionId,
    /// Hash of the request the key was first used with.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Everything written when a session is created.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session: Session,
    pub idempotency: IdempotencyRecord,
    pub order: Option<QueuedOrder>,
}

/// Result of [`StorageAdapter::create_session`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Session),
    /// An unexpired record already holds this key; nothing was written.
    Replayed(IdempotencyRecord),
    /// The actor already has a non-terminal session for the destination.
    ActiveSessionExists(SessionId),
}

/// Marks a linking code consumed in the same transaction as a session write.
#[derive(Debug, Clone)]
pub struct CodeConsumption {
    pub code: String,
    pub consumed_at: DateTime<Utc>,
}

/// Order write that accompanies a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTransition {
    /// `queued -> released` on arrival.
    Release(ReleasePlan),
    /// `released | acknowledged | ready -> completed` on redemption.
    Complete { at: DateTime<Utc> },
    /// `queued | released | acknowledged | ready -> canceled` when the session
    /// is canceled or expires without redemption.
    Cancel { at: DateTime<Utc> },
}

/// A compare-and-swap session write with its dependent records.
///
/// The store applies all parts in one transaction, conditioned on the session
/// still being at `expected_state` and `expected_version`.
#[derive(Debug, Clone)]
pub struct SessionCommit {
    pub expected_state: SessionState,
    pub expected_version: i64,
    /// The full new record. Its `version` must be `expected_version + 1`.
    pub session: Session,
    pub consume_code: Option<CodeConsumption>,
    pub order: Option<OrderTransition>,
}

/// Result of [`StorageAdapter::commit`]. Only `Committed` wrote anything.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Committed(Session),
    /// The session no longer matches the expected state/version.
    Stale,
    /// The linking code was consumed or expired concurrently.
    LinkingCodeUnavailable,
    /// Another session already holds the generated redemption code.
    RedemptionCodeTaken,
}

/// Outcome of a single dispatch attempt, as recorded on the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchRecord {
    Delivered {
        at: DateTime<Utc>,
    },
    Failed {
        at: DateTime<Utc>,
        error: String,
        /// `None` stops further retries.
        next_attempt_at: Option<DateTime<Utc>>,
    },
}

/// Adapter for the persistence backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), CurbsideError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), CurbsideError>;

    // --- Destinations ---

    async fn upsert_destination(&self, destination: &Destination) -> Result<(), CurbsideError>;

    async fn get_destination(&self, id: &str) -> Result<Option<Destination>, CurbsideError>;

    // --- Sessions ---

    /// Inserts a session, its idempotency record and optional order atomically.
    async fn create_session(
        &self,
        new_session: &NewSession,
        now: DateTime<Utc>,
    ) -> Result<CreateOutcome, CurbsideError>;

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, CurbsideError>;

    async fn find_active_session(
        &self,
        actor_id: &str,
        destination_id: &str,
    ) -> Result<Option<Session>, CurbsideError>;

    async fn find_session_by_redemption_code(
        &self,
        code: &str,
    ) -> Result<Option<Session>, CurbsideError>;

    /// Most recent session created with `key`, whether or not its
    /// idempotency record is still live.
    async fn find_session_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Session>, CurbsideError>;

    /// Non-terminal sessions whose deadline is at or before `now`.
    async fn list_due_sessions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Session>, CurbsideError>;

    /// Applies a compare-and-swap transition with its dependent writes.
    async fn commit(&self, commit: &SessionCommit) -> Result<CommitOutcome, CurbsideError>;

    // --- Idempotency ---

    async fn get_idempotency_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, CurbsideError>;

    // --- Linking codes ---

    /// Inserts a code. Returns `false` if an unexpired, unconsumed code with
    /// the same value exists.
    async fn insert_linking_code(
        &self,
        code: &LinkingCode,
        now: DateTime<Utc>,
    ) -> Result<bool, CurbsideError>;

    async fn get_linking_code(&self, code: &str) -> Result<Option<LinkingCode>, CurbsideError>;

    // --- Orders ---

    async fn get_order_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<QueuedOrder>, CurbsideError>;

    /// Released orders whose next dispatch attempt is due.
    async fn list_orders_due_for_dispatch(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueuedOrder>, CurbsideError>;

    /// Orders that were released but are not yet ready or finished, for
    /// sessions still in progress. Least recently polled first.
    async fn list_orders_awaiting_ready(
        &self,
        limit: usize,
    ) -> Result<Vec<QueuedOrder>, CurbsideError>;

    async fn record_dispatch(
        &self,
        order_id: &str,
        record: &DispatchRecord,
    ) -> Result<(), CurbsideError>;

    /// Records that the order's readiness was checked at `at`.
    async fn record_ready_poll(
        &self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CurbsideError>;

    /// Advances an order to `ready`. Returns `false` if it was not eligible.
    async fn mark_order_ready(
        &self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, CurbsideError>;

    // --- Maintenance ---

    /// Removes expired idempotency records and linking codes created before
    /// `code_cutoff`.
    async fn purge(
        &self,
        now: DateTime<Utc>,
        code_cutoff: DateTime<Utc>,
    ) -> Result<PurgeStats, CurbsideError>;
}

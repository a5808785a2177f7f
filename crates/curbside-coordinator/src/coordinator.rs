// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The arrival coordinator: the client-facing operations over sessions.
//!
//! Every mutation follows the same shape: load the session, apply pending
//! deadline expiry, compute the next record with [`machine::apply`], and
//! commit it conditioned on the loaded `(state, version)`. A lost race reloads
//! and re-evaluates; it never overwrites.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curbside_core::traits::storage::{
    CodeConsumption, CommitOutcome, CreateOutcome, IdempotencyRecord, NewSession, OrderTransition,
    SessionCommit,
};
use curbside_core::{
    ChannelMetadata, Clock, ConflictKind, CurbsideError, Destination, Entity, ExpiredKind,
    FulfillmentAdapter, LinkingCode, NotificationAdapter, OrderRequest, OrderStatus, Position,
    PurgeStats, QueuedOrder, Redemption, RedemptionCode, Session, SessionId, SessionState,
    StateTimestamps, StorageAdapter,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::events::{EventBus, SessionEvent};
use crate::geofence::{self, ArrivalCheck};
use crate::idempotency::{IdempotencyGuard, fingerprint};
use crate::linking;
use crate::machine::{self, Transition};
use crate::policy::CoordinatorPolicy;
use crate::release::{OrderReleaseCoordinator, plan_release};

/// Reload-and-retry bound for a single request losing compare-and-swap races.
const MAX_CAS_RETRIES: usize = 3;

/// Redemption code regeneration bound on collision.
const MAX_REDEMPTION_CODE_ATTEMPTS: usize = 5;

/// Longest accepted actor, destination or order reference identifier.
const MAX_ID_LEN: usize = 255;

/// Input to [`ArrivalCoordinator::start_session`].
#[derive(Debug, Clone)]
pub struct StartSession {
    pub actor_id: String,
    pub destination_id: String,
    pub idempotency_key: String,
    pub order: Option<OrderRequest>,
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub session: Session,
    /// The idempotency key matched an earlier request.
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedLinkingCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of one position report.
#[derive(Debug, Clone)]
pub struct PositionReport {
    pub arrived: bool,
    pub distance_m: f64,
    pub accuracy_m: Option<f64>,
    pub state: SessionState,
    /// Present only once arrived.
    pub redemption: Option<Redemption>,
}

/// How a status read names its session.
#[derive(Debug, Clone)]
pub enum SessionLookup {
    Id(SessionId),
    IdempotencyKey(String),
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub session: Session,
    pub destination: Option<Destination>,
    pub order: Option<QueuedOrder>,
}

impl SessionStatus {
    /// The redemption, if the session's state allows showing it.
    pub fn redemption(&self) -> Option<&Redemption> {
        self.session.visible_redemption()
    }
}

/// Facade over the session state machine and its collaborators.
pub struct ArrivalCoordinator {
    store: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    policy: CoordinatorPolicy,
    idempotency: IdempotencyGuard,
    events: EventBus,
    release: Arc<OrderReleaseCoordinator>,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, CurbsideError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CurbsideError::validation(field, "must not be empty"));
    }
    if value.len() > MAX_ID_LEN {
        return Err(CurbsideError::validation(
            field,
            format!("must be at most {MAX_ID_LEN} bytes"),
        ));
    }
    Ok(value)
}

fn wrong_state(action: &str, state: SessionState) -> CurbsideError {
    CurbsideError::conflict(
        ConflictKind::WrongState,
        format!("cannot {action} a session in state {state}"),
    )
}

fn stale(id: &SessionId) -> CurbsideError {
    CurbsideError::conflict(
        ConflictKind::StaleState,
        format!("session {id} changed concurrently; retry the request"),
    )
}

fn session_expired() -> CurbsideError {
    CurbsideError::Expired {
        what: ExpiredKind::Session,
    }
}

fn unexpected(outcome: &CommitOutcome) -> CurbsideError {
    CurbsideError::Internal(format!("unexpected commit outcome: {outcome:?}"))
}

impl ArrivalCoordinator {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        notifier: Arc<dyn NotificationAdapter>,
        fulfillment: Option<Arc<dyn FulfillmentAdapter>>,
        clock: Arc<dyn Clock>,
        policy: CoordinatorPolicy,
    ) -> Self {
        let release = Arc::new(OrderReleaseCoordinator::new(
            store.clone(),
            notifier,
            fulfillment,
            clock.clone(),
            policy.retry.clone(),
            policy.sweep_batch_size,
        ));
        Self {
            store,
            clock,
            idempotency: IdempotencyGuard::new(policy.idempotency_ttl),
            policy,
            events: EventBus::default(),
            release,
        }
    }

    pub fn policy(&self) -> &CoordinatorPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn StorageAdapter> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn release(&self) -> Arc<OrderReleaseCoordinator> {
        self.release.clone()
    }

    // --- Start session ---

    /// Creates a session, or replays the one created earlier with the same
    /// idempotency key.
    pub async fn start_session(&self, request: StartSession) -> Result<StartOutcome, CurbsideError> {
        let key = IdempotencyGuard::validate_key(&request.idempotency_key)?;
        let actor_id = required("actor_id", &request.actor_id)?;
        let destination_id = required("destination_id", &request.destination_id)?;
        if let Some(order) = &request.order {
            required("order.reference", &order.reference)?;
        }
        let fingerprint = fingerprint(actor_id, destination_id);
        let now = self.clock.now();

        if let Some(record) = self.store.get_idempotency_record(key, now).await? {
            return self.replay(&record, &fingerprint).await;
        }

        let destination = self
            .store
            .get_destination(destination_id)
            .await?
            .ok_or_else(|| CurbsideError::not_found(Entity::Destination, destination_id))?;

        if let Some(active) = self.store.find_active_session(actor_id, destination_id).await? {
            let active = self.refresh(active).await?;
            if !active.state.is_terminal() {
                return Err(CurbsideError::conflict(
                    ConflictKind::DuplicateActiveSession,
                    format!(
                        "actor already has session {} in state {} for this destination",
                        active.id, active.state
                    ),
                ));
            }
        }

        let id = SessionId(uuid::Uuid::new_v4().to_string());
        let mut session = Session {
            id: id.clone(),
            idempotency_key: key.to_string(),
            actor_id: actor_id.to_string(),
            destination_id: destination.id.clone(),
            anchor: destination.anchor(self.policy.default_radius_m),
            state: SessionState::Pending,
            version: 0,
            created_at: now,
            updated_at: now,
            timestamps: StateTimestamps::default(),
            deadline: None,
            link_attempts: 0,
            redemption: None,
            expiry_reason: None,
        };
        session.deadline = machine::deadline(&session, &self.policy.deadlines);

        let order = request.order.map(|order| QueuedOrder {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: id.clone(),
            destination_id: destination.id.clone(),
            reference: order.reference.trim().to_string(),
            lead_time_secs: order.lead_time_secs,
            status: OrderStatus::Queued,
            created_at: now,
            release_at: None,
            released_at: None,
            estimated_ready_at: None,
            acknowledged_at: None,
            ready_at: None,
            completed_at: None,
            canceled_at: None,
            dispatch_attempts: 0,
            next_dispatch_at: None,
            last_dispatch_error: None,
        });

        let new_session = NewSession {
            idempotency: self.idempotency.record(key, &id, fingerprint.clone(), now),
            session,
            order,
        };

        match self.store.create_session(&new_session, now).await? {
            CreateOutcome::Created(session) => {
                info!(
                    session_id = %session.id,
                    destination_id = %session.destination_id,
                    has_order = new_session.order.is_some(),
                    "session started"
                );
                self.events.publish(SessionEvent {
                    session_id: session.id.clone(),
                    from: None,
                    to: SessionState::Pending,
                    at: now,
                });
                Ok(StartOutcome {
                    session,
                    replayed: false,
                })
            }
            CreateOutcome::Replayed(record) => self.replay(&record, &fingerprint).await,
            CreateOutcome::ActiveSessionExists(existing) => Err(CurbsideError::conflict(
                ConflictKind::DuplicateActiveSession,
                format!("actor already has active session {existing} for this destination"),
            )),
        }
    }

    async fn replay(
        &self,
        record: &IdempotencyRecord,
        presented: &str,
    ) -> Result<StartOutcome, CurbsideError> {
        let id = self.idempotency.replay(record, presented)?;
        let session = self.store.get_session(&id).await?.ok_or_else(|| {
            CurbsideError::Internal(format!("idempotency record names missing session {id}"))
        })?;
        debug!(session_id = %id, "start session replayed");
        Ok(StartOutcome {
            session: self.refresh(session).await?,
            replayed: true,
        })
    }

    // --- Linking codes ---

    /// Issues a fresh linking code to the vehicle channel.
    pub async fn issue_linking_code(
        &self,
        channel: ChannelMetadata,
    ) -> Result<IssuedLinkingCode, CurbsideError> {
        linking::validate_channel(&channel)?;
        let attempts = self.policy.max_code_generation_attempts.max(1);

        for attempt in 1..=attempts {
            let now = self.clock.now();
            let code = linking::generate_linking_code(&mut rand::thread_rng());
            let record =
                linking::new_linking_code(code, channel.clone(), now, self.policy.linking_code_ttl);
            if self.store.insert_linking_code(&record, now).await? {
                info!(
                    channel = %channel.channel,
                    device_id = ?channel.device_id,
                    expires_at = %record.expires_at,
                    "linking code issued"
                );
                return Ok(IssuedLinkingCode {
                    code: record.code,
                    expires_at: record.expires_at,
                });
            }
            debug!(attempt, "linking code collided with a live code");
        }
        Err(CurbsideError::Internal(format!(
            "no unique linking code after {attempts} attempts"
        )))
    }

    /// Consumes `code` for `session_id`, moving the session to `LINKED`.
    ///
    /// The code is checked before the session so a spent code always reports
    /// as invalid. Unknown or expired codes against a `PENDING` session count
    /// toward the attempt bound; a spent code changes no session.
    pub async fn consume_linking_code(
        &self,
        session_id: &SessionId,
        code: &str,
    ) -> Result<Session, CurbsideError> {
        let code = linking::normalize_linking_code(code)?;
        let mut session = self.refresh(self.load(session_id).await?).await?;

        for _ in 0..MAX_CAS_RETRIES {
            let now = self.clock.now();
            let record = self.store.get_linking_code(&code).await?;
            if let Some(cause) = linking::unusable_reason(record.as_ref(), now) {
                return Err(self.reject_code(session, record.as_ref(), now, cause).await?);
            }

            match session.state {
                SessionState::Pending => {}
                SessionState::Expired => return Err(session_expired()),
                state => return Err(wrong_state("link", state)),
            }

            let next = machine::apply(&session, [Transition::Link], now, &self.policy.deadlines)?;
            let consumption = CodeConsumption {
                code: code.clone(),
                consumed_at: now,
            };
            match self.commit(&session, next, Some(consumption), None).await? {
                CommitOutcome::Committed(linked) => {
                    info!(session_id = %linked.id, "session linked");
                    return Ok(linked);
                }
                CommitOutcome::Stale => {
                    session = self.refresh(self.load(session_id).await?).await?;
                }
                CommitOutcome::LinkingCodeUnavailable => {
                    let now = self.clock.now();
                    let record = self.store.get_linking_code(&code).await?;
                    let cause = linking::unusable_reason(record.as_ref(), now)
                        .unwrap_or(CurbsideError::InvalidLinkingCode);
                    return Err(self.reject_code(session, record.as_ref(), now, cause).await?);
                }
                outcome @ CommitOutcome::RedemptionCodeTaken => return Err(unexpected(&outcome)),
            }
        }
        Err(stale(session_id))
    }

    /// Reports an unusable code. Spent codes leave the session untouched;
    /// unknown and expired codes count as a failed attempt.
    async fn reject_code(
        &self,
        session: Session,
        record: Option<&LinkingCode>,
        now: DateTime<Utc>,
        cause: CurbsideError,
    ) -> Result<CurbsideError, CurbsideError> {
        if linking::counts_as_failed_attempt(record, now) {
            self.failed_attempt(session, cause).await
        } else {
            debug!(session_id = %session.id, "spent linking code presented");
            Ok(cause)
        }
    }

    /// Counts a failed linking attempt against a `PENDING` session and
    /// returns the error to report. Crossing the bound expires the session.
    async fn failed_attempt(
        &self,
        mut session: Session,
        cause: CurbsideError,
    ) -> Result<CurbsideError, CurbsideError> {
        for _ in 0..MAX_CAS_RETRIES {
            if session.state != SessionState::Pending {
                return Ok(cause);
            }
            let now = self.clock.now();
            let next = machine::apply(
                &session,
                [Transition::FailedLinkAttempt],
                now,
                &self.policy.deadlines,
            )?;
            let order = (next.state == SessionState::Expired)
                .then_some(OrderTransition::Cancel { at: now });
            match self.commit(&session, next, None, order).await? {
                CommitOutcome::Committed(updated) if updated.state == SessionState::Expired => {
                    warn!(
                        session_id = %updated.id,
                        attempts = updated.link_attempts,
                        "linking attempts exhausted, session expired"
                    );
                    return Ok(CurbsideError::RateLimited {
                        message: format!(
                            "more than {} failed linking attempts; start a new session",
                            self.policy.deadlines.max_link_attempts
                        ),
                    });
                }
                CommitOutcome::Committed(updated) => {
                    debug!(session_id = %updated.id, attempts = updated.link_attempts, "linking attempt failed");
                    return Ok(cause);
                }
                CommitOutcome::Stale => session = self.load(&session.id).await?,
                outcome => return Err(unexpected(&outcome)),
            }
        }
        Ok(cause)
    }

    // --- Position reports ---

    /// Evaluates a position against the session's anchor. Inside the
    /// geofence, the session arrives: a redemption code is issued and any
    /// queued order is released in the same commit.
    pub async fn report_position(
        &self,
        session_id: &SessionId,
        position: Position,
    ) -> Result<PositionReport, CurbsideError> {
        geofence::validate_position(&position)?;
        let mut session = self.refresh(self.load(session_id).await?).await?;

        for _ in 0..MAX_CAS_RETRIES {
            let check = geofence::evaluate(&session.anchor, &position)?;
            match session.state {
                SessionState::Linked | SessionState::EnRoute => {}
                SessionState::Arrived => return Ok(report(&session, &check, true)),
                SessionState::Expired => return Err(session_expired()),
                state => return Err(wrong_state("report a position for", state)),
            }

            if !check.arrived && session.state == SessionState::EnRoute {
                return Ok(report(&session, &check, false));
            }

            match self.advance(&session, &check).await? {
                Some(updated) => {
                    if updated.state == SessionState::Arrived {
                        info!(
                            session_id = %updated.id,
                            distance_m = check.distance_m,
                            "session arrived"
                        );
                        self.release.wake();
                    }
                    let arrived = updated.state == SessionState::Arrived;
                    return Ok(report(&updated, &check, arrived));
                }
                None => session = self.refresh(self.load(session_id).await?).await?,
            }
        }
        Err(stale(session_id))
    }

    /// Commits the route start and/or arrival for one report. `None` means
    /// the compare-and-swap was lost.
    async fn advance(
        &self,
        session: &Session,
        check: &ArrivalCheck,
    ) -> Result<Option<Session>, CurbsideError> {
        let now = self.clock.now();
        let mut base = Vec::new();
        if session.state == SessionState::Linked {
            base.push(Transition::StartRoute);
        }
        if !check.arrived {
            let next = machine::apply(session, base, now, &self.policy.deadlines)?;
            return match self.commit(session, next, None, None).await? {
                CommitOutcome::Committed(updated) => Ok(Some(updated)),
                CommitOutcome::Stale => Ok(None),
                outcome => Err(unexpected(&outcome)),
            };
        }

        let release = self.release_transition(session, now).await?;
        for attempt in 1..=MAX_REDEMPTION_CODE_ATTEMPTS {
            let code = linking::generate_redemption_code(
                &mut rand::thread_rng(),
                self.policy.redemption_code_length,
            );
            let redemption = Redemption {
                code: RedemptionCode::new(code),
                expires_at: now + self.policy.redemption_ttl,
            };
            let mut transitions = base.clone();
            transitions.push(Transition::Arrive(redemption));
            let next = machine::apply(session, transitions, now, &self.policy.deadlines)?;

            match self.commit(session, next, None, release).await? {
                CommitOutcome::Committed(updated) => return Ok(Some(updated)),
                CommitOutcome::Stale => return Ok(None),
                CommitOutcome::RedemptionCodeTaken => {
                    debug!(session_id = %session.id, attempt, "redemption code collision");
                }
                outcome @ CommitOutcome::LinkingCodeUnavailable => {
                    return Err(unexpected(&outcome));
                }
            }
        }
        Err(CurbsideError::Internal(format!(
            "no unique redemption code after {MAX_REDEMPTION_CODE_ATTEMPTS} attempts"
        )))
    }

    async fn release_transition(
        &self,
        session: &Session,
        at: DateTime<Utc>,
    ) -> Result<Option<OrderTransition>, CurbsideError> {
        let Some(order) = self.store.get_order_for_session(&session.id).await? else {
            return Ok(None);
        };
        if order.status != OrderStatus::Queued {
            return Ok(None);
        }
        let approach_secs = self
            .store
            .get_destination(&session.destination_id)
            .await?
            .and_then(|destination| destination.approach_secs);
        let plan = plan_release(&order, approach_secs, at);
        debug!(
            order_id = %order.id,
            estimated_ready_at = %plan.estimated_ready_at,
            lead_within_approach = plan.lead_within_approach,
            "order release planned"
        );
        Ok(Some(OrderTransition::Release(plan)))
    }

    // --- Redemption ---

    /// Confirms a redemption code, completing the session and its order.
    pub async fn confirm_redemption(&self, code: &str) -> Result<Session, CurbsideError> {
        let code = linking::normalize_redemption_code(code)?;
        let session = self
            .store
            .find_session_by_redemption_code(&code)
            .await?
            .ok_or_else(|| CurbsideError::not_found(Entity::RedemptionCode, "presented code"))?;
        let mut session = self.refresh(session).await?;

        for _ in 0..MAX_CAS_RETRIES {
            match session.state {
                SessionState::Arrived => {}
                SessionState::Completed => {
                    return Err(CurbsideError::AlreadyProcessed {
                        message: "redemption code was already redeemed".into(),
                    });
                }
                SessionState::Expired => {
                    return Err(CurbsideError::Expired {
                        what: ExpiredKind::RedemptionCode,
                    });
                }
                state => return Err(wrong_state("redeem", state)),
            }

            let now = self.clock.now();
            let next = machine::apply(&session, [Transition::Complete], now, &self.policy.deadlines)?;
            let order = Some(OrderTransition::Complete { at: now });
            match self.commit(&session, next, None, order).await? {
                CommitOutcome::Committed(completed) => {
                    info!(session_id = %completed.id, "redemption confirmed");
                    return Ok(completed);
                }
                CommitOutcome::Stale => {
                    session = self.refresh(self.load(&session.id).await?).await?;
                }
                outcome => return Err(unexpected(&outcome)),
            }
        }
        Err(stale(&session.id))
    }

    // --- Status and cancellation ---

    pub async fn get_status(&self, lookup: SessionLookup) -> Result<SessionStatus, CurbsideError> {
        let session = match lookup {
            SessionLookup::Id(id) => self.load(&id).await?,
            SessionLookup::IdempotencyKey(key) => self.load_by_key(&key).await?,
        };
        let session = self.refresh(session).await?;
        let destination = self.store.get_destination(&session.destination_id).await?;
        let order = self.store.get_order_for_session(&session.id).await?;
        Ok(SessionStatus {
            session,
            destination,
            order,
        })
    }

    async fn load_by_key(&self, key: &str) -> Result<Session, CurbsideError> {
        let key = IdempotencyGuard::validate_key(key)?;
        if let Some(record) = self
            .store
            .get_idempotency_record(key, self.clock.now())
            .await?
        {
            if let Some(session) = self.store.get_session(&record.session_id).await? {
                return Ok(session);
            }
        }
        self.store
            .find_session_by_idempotency_key(key)
            .await?
            .ok_or_else(|| CurbsideError::not_found(Entity::Session, key))
    }

    /// Cancels a session. Canceling an already canceled session succeeds.
    pub async fn cancel_session(&self, session_id: &SessionId) -> Result<Session, CurbsideError> {
        let mut session = self.refresh(self.load(session_id).await?).await?;

        for _ in 0..MAX_CAS_RETRIES {
            match session.state {
                SessionState::Canceled => return Ok(session),
                SessionState::Expired => return Err(session_expired()),
                SessionState::Completed => return Err(wrong_state("cancel", session.state)),
                _ => {}
            }
            let now = self.clock.now();
            let order = Some(OrderTransition::Cancel { at: now });
            let next = machine::apply(&session, [Transition::Cancel], now, &self.policy.deadlines)?;
            match self.commit(&session, next, None, order).await? {
                CommitOutcome::Committed(canceled) => {
                    info!(session_id = %canceled.id, from = %session.state, "session canceled");
                    return Ok(canceled);
                }
                CommitOutcome::Stale => {
                    session = self.refresh(self.load(session_id).await?).await?;
                }
                outcome => return Err(unexpected(&outcome)),
            }
        }
        Err(stale(session_id))
    }

    // --- Maintenance ---

    /// Expires one batch of sessions whose deadline has passed. Returns how
    /// many this pass expired.
    pub async fn expire_due_sessions(&self) -> Result<usize, CurbsideError> {
        let due = self
            .store
            .list_due_sessions(self.clock.now(), self.policy.sweep_batch_size.max(1))
            .await?;
        let mut expired = 0;
        for session in due {
            let id = session.id.clone();
            match self.refresh(session).await {
                Ok(session) if session.state == SessionState::Expired => expired += 1,
                Ok(_) => {}
                Err(err @ CurbsideError::Storage { .. }) => return Err(err),
                Err(err) => warn!(session_id = %id, error = %err, "could not expire session"),
            }
        }
        Ok(expired)
    }

    /// Drops expired idempotency records and linking codes past retention.
    pub async fn purge(&self) -> Result<PurgeStats, CurbsideError> {
        let now = self.clock.now();
        self.store
            .purge(now, now - self.policy.linking_code_retention)
            .await
    }

    // --- Internals ---

    async fn load(&self, id: &SessionId) -> Result<Session, CurbsideError> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| CurbsideError::not_found(Entity::Session, id.as_str()))
    }

    /// Applies deadline expiry if due. Used on every read and before every
    /// transition, and by the sweeper.
    async fn refresh(&self, mut session: Session) -> Result<Session, CurbsideError> {
        for _ in 0..MAX_CAS_RETRIES {
            let now = self.clock.now();
            let Some(reason) = machine::due_expiry(&session, now, &self.policy.deadlines) else {
                return Ok(session);
            };
            let next = machine::apply(
                &session,
                [Transition::Expire(reason)],
                now,
                &self.policy.deadlines,
            )?;
            let order = Some(OrderTransition::Cancel { at: now });
            match self.commit(&session, next, None, order).await? {
                CommitOutcome::Committed(expired) => {
                    info!(
                        session_id = %expired.id,
                        from = %session.state,
                        %reason,
                        "session expired"
                    );
                    return Ok(expired);
                }
                CommitOutcome::Stale => session = self.load(&session.id).await?,
                outcome => return Err(unexpected(&outcome)),
            }
        }
        Err(stale(&session.id))
    }

    /// Compare-and-swap write of `next` over `current`, publishing the
    /// entered states on success.
    async fn commit(
        &self,
        current: &Session,
        next: Session,
        consume_code: Option<CodeConsumption>,
        order: Option<OrderTransition>,
    ) -> Result<CommitOutcome, CurbsideError> {
        let commit = SessionCommit {
            expected_state: current.state,
            expected_version: current.version,
            session: next,
            consume_code,
            order,
        };
        let outcome = self.store.commit(&commit).await?;
        if let CommitOutcome::Committed(updated) = &outcome {
            let mut from = current.state;
            for to in machine::entered_states(current, updated) {
                self.events.publish(SessionEvent {
                    session_id: updated.id.clone(),
                    from: Some(from),
                    to,
                    at: updated.updated_at,
                });
                from = to;
            }
        }
        Ok(outcome)
    }
}

fn report(session: &Session, check: &ArrivalCheck, arrived: bool) -> PositionReport {
    PositionReport {
        arrived,
        distance_m: check.distance_m,
        accuracy_m: check.accuracy_m,
        state: session.state,
        redemption: if arrived {
            session.visible_redemption().cloned()
        } else {
            None
        },
    }
}

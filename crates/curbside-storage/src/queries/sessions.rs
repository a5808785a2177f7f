// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session creation, lookup and compare-and-swap transitions.

use chrono::{DateTime, Utc};
use curbside_core::traits::storage::{CommitOutcome, CreateOutcome, NewSession, SessionCommit};
use curbside_core::{CurbsideError, Session, SessionId};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{ACTIVE_STATES_SQL, SESSION_COLUMNS, session_from_row, ts, ts_opt};
use crate::queries::{idempotency, is_constraint_violation, linking_codes, orders};

/// Inserts a session with its idempotency record and optional order.
///
/// Nothing is written when the key is still live or the actor already holds
/// an active session for the destination.
pub async fn create_session(
    db: &Database,
    new_session: &NewSession,
    now: DateTime<Utc>,
) -> Result<CreateOutcome, CurbsideError> {
    let new_session = new_session.clone();
    db.connection()
        .call(move |conn| -> Result<CreateOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;

            if let Some(existing) = idempotency::live_record(&tx, &new_session.idempotency.key, now)? {
                return Ok(CreateOutcome::Replayed(existing));
            }

            let session = &new_session.session;
            let active: Option<String> = tx
                .query_row(
                    &format!(
                        "SELECT id FROM sessions
                         WHERE actor_id = ?1 AND destination_id = ?2 AND state IN {ACTIVE_STATES_SQL}"
                    ),
                    params![session.actor_id, session.destination_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = active {
                return Ok(CreateOutcome::ActiveSessionExists(SessionId(id)));
            }

            tx.execute(
                &format!(
                    "INSERT INTO sessions ({SESSION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                             ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
                ),
                params![
                    session.id.as_str(),
                    session.idempotency_key,
                    session.actor_id,
                    session.destination_id,
                    session.anchor.latitude,
                    session.anchor.longitude,
                    session.anchor.radius_m,
                    session.state.to_string(),
                    session.version,
                    ts(session.created_at),
                    ts(session.updated_at),
                    ts_opt(session.timestamps.linked_at),
                    ts_opt(session.timestamps.en_route_at),
                    ts_opt(session.timestamps.arrived_at),
                    ts_opt(session.timestamps.completed_at),
                    ts_opt(session.timestamps.expired_at),
                    ts_opt(session.timestamps.canceled_at),
                    ts_opt(session.deadline),
                    session.link_attempts,
                    session.redemption.as_ref().map(|r| r.code.as_str().to_string()),
                    session.redemption.as_ref().map(|r| ts(r.expires_at)),
                    session.expiry_reason.map(|r| r.to_string()),
                ],
            )?;
            idempotency::put_record(&tx, &new_session.idempotency)?;
            if let Some(order) = &new_session.order {
                orders::insert(&tx, order)?;
            }
            tx.commit()?;
            Ok(CreateOutcome::Created(new_session.session))
        })
        .await
        .map_err(map_tr_err)
}

async fn select_one(
    db: &Database,
    filter: &'static str,
    value: String,
) -> Result<Option<Session>, CurbsideError> {
    db.connection()
        .call(move |conn| -> Result<Option<Session>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE {filter}"),
                params![value],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_session(db: &Database, id: &SessionId) -> Result<Option<Session>, CurbsideError> {
    select_one(db, "id = ?1", id.as_str().to_string()).await
}

pub async fn find_by_redemption_code(
    db: &Database,
    code: &str,
) -> Result<Option<Session>, CurbsideError> {
    select_one(db, "redemption_code = ?1", code.to_string()).await
}

/// Most recent session created under `key`.
pub async fn find_by_idempotency_key(
    db: &Database,
    key: &str,
) -> Result<Option<Session>, CurbsideError> {
    select_one(
        db,
        "idempotency_key = ?1 ORDER BY created_at DESC LIMIT 1",
        key.to_string(),
    )
    .await
}

pub async fn find_active(
    db: &Database,
    actor_id: &str,
    destination_id: &str,
) -> Result<Option<Session>, CurbsideError> {
    let actor_id = actor_id.to_string();
    let destination_id = destination_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Session>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE actor_id = ?1 AND destination_id = ?2 AND state IN {ACTIVE_STATES_SQL}"
                ),
                params![actor_id, destination_id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Active sessions whose deadline has passed, oldest deadline first.
pub async fn list_due(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<Session>, CurbsideError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<Session>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE state IN {ACTIVE_STATES_SQL} AND deadline IS NOT NULL AND deadline <= ?1
                 ORDER BY deadline LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![ts(now), limit], session_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Applies a compare-and-swap transition and its dependent writes in one
/// transaction. Any mismatch rolls everything back.
pub async fn commit(db: &Database, commit: &SessionCommit) -> Result<CommitOutcome, CurbsideError> {
    let commit = commit.clone();
    db.connection()
        .call(move |conn| -> Result<CommitOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let session = &commit.session;

            if let Some(consumption) = &commit.consume_code {
                if !linking_codes::consume(&tx, consumption, &session.id)? {
                    return Ok(CommitOutcome::LinkingCodeUnavailable);
                }
            }

            let updated = tx.execute(
                "UPDATE sessions SET
                     state = ?4, version = ?5, updated_at = ?6,
                     linked_at = ?7, en_route_at = ?8, arrived_at = ?9, completed_at = ?10,
                     expired_at = ?11, canceled_at = ?12, deadline = ?13, link_attempts = ?14,
                     redemption_code = ?15, redemption_expires_at = ?16, expiry_reason = ?17
                 WHERE id = ?1 AND state = ?2 AND version = ?3",
                params![
                    session.id.as_str(),
                    commit.expected_state.to_string(),
                    commit.expected_version,
                    session.state.to_string(),
                    session.version,
                    ts(session.updated_at),
                    ts_opt(session.timestamps.linked_at),
                    ts_opt(session.timestamps.en_route_at),
                    ts_opt(session.timestamps.arrived_at),
                    ts_opt(session.timestamps.completed_at),
                    ts_opt(session.timestamps.expired_at),
                    ts_opt(session.timestamps.canceled_at),
                    ts_opt(session.deadline),
                    session.link_attempts,
                    session.redemption.as_ref().map(|r| r.code.as_str().to_string()),
                    session.redemption.as_ref().map(|r| ts(r.expires_at)),
                    session.expiry_reason.map(|r| r.to_string()),
                ],
            );
            match updated {
                Ok(1) => {}
                Ok(_) => {
                    debug!(session_id = %session.id, "compare-and-swap lost");
                    return Ok(CommitOutcome::Stale);
                }
                Err(e) if is_constraint_violation(&e) => {
                    return Ok(CommitOutcome::RedemptionCodeTaken);
                }
                Err(e) => return Err(e),
            }

            if let Some(transition) = &commit.order {
                orders::apply_transition(&tx, &session.id, transition)?;
            }
            tx.commit()?;
            Ok(CommitOutcome::Committed(commit.session))
        })
        .await
        .map_err(map_tr_err)
}

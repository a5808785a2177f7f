// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queued order persistence and dispatch bookkeeping.

use chrono::{DateTime, Utc};
use curbside_core::traits::storage::{DispatchRecord, OrderTransition};
use curbside_core::{CurbsideError, QueuedOrder, SessionId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{ORDER_COLUMNS, order_from_row, ts, ts_opt};
use crate::queries::to_i64;

pub(crate) fn insert(conn: &Connection, order: &QueuedOrder) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO orders (id, session_id, destination_id, reference, lead_time_secs, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            order.id,
            order.session_id.as_str(),
            order.destination_id,
            order.reference,
            to_i64(order.lead_time_secs),
            order.status.to_string(),
            ts(order.created_at),
        ],
    )?;
    Ok(())
}

/// Applies an order transition for `session_id` inside the caller's
/// transaction. Orders not in a source status are left untouched.
pub(crate) fn apply_transition(
    conn: &Connection,
    session_id: &SessionId,
    transition: &OrderTransition,
) -> rusqlite::Result<usize> {
    match transition {
        OrderTransition::Release(plan) => conn.execute(
            "UPDATE orders
             SET status = 'released', release_at = ?2, released_at = ?2,
                 estimated_ready_at = ?3, next_dispatch_at = ?2
             WHERE session_id = ?1 AND status = 'queued'",
            params![
                session_id.as_str(),
                ts(plan.release_at),
                ts(plan.estimated_ready_at)
            ],
        ),
        OrderTransition::Complete { at } => conn.execute(
            "UPDATE orders
             SET status = 'completed', completed_at = ?2, next_dispatch_at = NULL
             WHERE session_id = ?1 AND status IN ('released', 'acknowledged', 'ready')",
            params![session_id.as_str(), ts(*at)],
        ),
        OrderTransition::Cancel { at } => conn.execute(
            "UPDATE orders
             SET status = 'canceled', canceled_at = ?2, next_dispatch_at = NULL
             WHERE session_id = ?1
               AND status IN ('queued', 'released', 'acknowledged', 'ready')",
            params![session_id.as_str(), ts(*at)],
        ),
    }
}

pub async fn get_order_for_session(
    db: &Database,
    session_id: &SessionId,
) -> Result<Option<QueuedOrder>, CurbsideError> {
    let session_id = session_id.clone();
    db.connection()
        .call(move |conn| -> Result<Option<QueuedOrder>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE session_id = ?1"),
                params![session_id.as_str()],
                order_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Released orders with a dispatch attempt due at or before `now`.
pub async fn list_due_for_dispatch(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<QueuedOrder>, CurbsideError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<QueuedOrder>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE status = 'released' AND next_dispatch_at IS NOT NULL
                   AND next_dispatch_at <= ?1
                 ORDER BY next_dispatch_at LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![ts(now), limit], order_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Released or acknowledged orders of live sessions still waiting for a
/// ready signal, least recently polled first.
pub async fn list_awaiting_ready(
    db: &Database,
    limit: usize,
) -> Result<Vec<QueuedOrder>, CurbsideError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<QueuedOrder>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders
                 WHERE status IN ('released', 'acknowledged')
                   AND EXISTS (
                       SELECT 1 FROM sessions
                       WHERE sessions.id = orders.session_id
                         AND sessions.state NOT IN ('COMPLETED', 'EXPIRED', 'CANCELED')
                   )
                 ORDER BY last_polled_at IS NOT NULL, last_polled_at, released_at
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], order_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Records the outcome of one dispatch attempt.
///
/// Delivery moves a `released` order to `acknowledged`; later statuses are
/// kept as they are.
pub async fn record_dispatch(
    db: &Database,
    order_id: &str,
    record: &DispatchRecord,
) -> Result<(), CurbsideError> {
    let order_id = order_id.to_string();
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            match record {
                DispatchRecord::Delivered { at } => conn.execute(
                    "UPDATE orders
                     SET dispatch_attempts = dispatch_attempts + 1,
                         next_dispatch_at = NULL,
                         last_dispatch_error = NULL,
                         acknowledged_at = COALESCE(acknowledged_at, ?2),
                         status = CASE WHEN status = 'released' THEN 'acknowledged' ELSE status END
                     WHERE id = ?1",
                    params![order_id, ts(at)],
                )?,
                DispatchRecord::Failed {
                    at: _,
                    error,
                    next_attempt_at,
                } => conn.execute(
                    "UPDATE orders
                     SET dispatch_attempts = dispatch_attempts + 1,
                         next_dispatch_at = ?2,
                         last_dispatch_error = ?3
                     WHERE id = ?1",
                    params![order_id, ts_opt(next_attempt_at), error],
                )?,
            };
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Stamps the last readiness poll so the next batch starts elsewhere.
pub async fn record_ready_poll(
    db: &Database,
    order_id: &str,
    at: DateTime<Utc>,
) -> Result<(), CurbsideError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE orders SET last_polled_at = ?2 WHERE id = ?1",
                params![order_id, ts(at)],
            )
        })
        .await
        .map(|_| ())
        .map_err(map_tr_err)
}

/// Moves a released or acknowledged order to `ready`.
pub async fn mark_ready(
    db: &Database,
    order_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, CurbsideError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE orders SET status = 'ready', ready_at = ?2, next_dispatch_at = NULL
                 WHERE id = ?1 AND status IN ('released', 'acknowledged')",
                params![order_id, ts(at)],
            )
        })
        .await
        .map(|changed| changed == 1)
        .map_err(map_tr_err)
}

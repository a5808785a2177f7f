// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency key records.

use chrono::{DateTime, Utc};
use curbside_core::traits::storage::IdempotencyRecord;
use curbside_core::{CurbsideError, SessionId};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{get_ts, ts};

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<IdempotencyRecord> {
    Ok(IdempotencyRecord {
        key: row.get(0)?,
        session_id: SessionId(row.get(1)?),
        fingerprint: row.get(2)?,
        created_at: get_ts(row, 3)?,
        expires_at: get_ts(row, 4)?,
    })
}

/// Unexpired record for `key`, read inside an existing transaction.
pub(crate) fn live_record(
    conn: &Connection,
    key: &str,
    now: DateTime<Utc>,
) -> rusqlite::Result<Option<IdempotencyRecord>> {
    conn.query_row(
        "SELECT key, session_id, fingerprint, created_at, expires_at
         FROM idempotency_keys WHERE key = ?1 AND expires_at > ?2",
        params![key, ts(now)],
        record_from_row,
    )
    .optional()
}

/// Replaces any stale record for the key with `record`.
pub(crate) fn put_record(conn: &Connection, record: &IdempotencyRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO idempotency_keys (key, session_id, fingerprint, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(key) DO UPDATE SET
             session_id = excluded.session_id,
             fingerprint = excluded.fingerprint,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at",
        params![
            record.key,
            record.session_id.as_str(),
            record.fingerprint,
            ts(record.created_at),
            ts(record.expires_at),
        ],
    )?;
    Ok(())
}

pub async fn get_record(
    db: &Database,
    key: &str,
    now: DateTime<Utc>,
) -> Result<Option<IdempotencyRecord>, CurbsideError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<IdempotencyRecord>, rusqlite::Error> {
            live_record(conn, &key, now)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes records that expired at or before `now`. Returns the count removed.
pub async fn purge_expired(db: &Database, now: DateTime<Utc>) -> Result<u64, CurbsideError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM idempotency_keys WHERE expires_at <= ?1",
                params![ts(now)],
            )
        })
        .await
        .map(|n| n as u64)
        .map_err(map_tr_err)
}

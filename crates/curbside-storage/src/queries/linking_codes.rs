// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linking code issue, lookup and consumption.

use chrono::{DateTime, Utc};
use curbside_core::traits::storage::CodeConsumption;
use curbside_core::{CurbsideError, LinkingCode, SessionId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{LINKING_CODE_COLUMNS, linking_code_from_row, ts, ts_opt};

/// Inserts `code` unless an unexpired active code with the same value exists.
///
/// Active rows whose expiry has passed are flipped to `expired` first so the
/// value can be reissued.
pub async fn insert_linking_code(
    db: &Database,
    code: &LinkingCode,
    now: DateTime<Utc>,
) -> Result<bool, CurbsideError> {
    let code = code.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE linking_codes SET status = 'expired'
                 WHERE code = ?1 AND status = 'active' AND expires_at <= ?2",
                params![code.code, ts(now)],
            )?;
            let inserted = tx.execute(
                "INSERT INTO linking_codes
                     (code, channel, device_id, label, status, created_at, expires_at, consumed_at, consumed_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT DO NOTHING",
                params![
                    code.code,
                    code.channel.channel,
                    code.channel.device_id,
                    code.channel.label,
                    code.status.to_string(),
                    ts(code.created_at),
                    ts(code.expires_at),
                    ts_opt(code.consumed_at),
                    code.consumed_by.as_ref().map(|s| s.as_str().to_string()),
                ],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recently issued code with this value.
pub async fn get_linking_code(
    db: &Database,
    code: &str,
) -> Result<Option<LinkingCode>, CurbsideError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<LinkingCode>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {LINKING_CODE_COLUMNS} FROM linking_codes
                     WHERE code = ?1 ORDER BY id DESC LIMIT 1"
                ),
                params![code],
                linking_code_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Marks the active code consumed by `session_id`, inside the caller's
/// transaction. Returns `false` if the code is no longer active or has expired.
pub(crate) fn consume(
    conn: &Connection,
    consumption: &CodeConsumption,
    session_id: &SessionId,
) -> rusqlite::Result<bool> {
    let at = ts(consumption.consumed_at);
    let changed = conn.execute(
        "UPDATE linking_codes
         SET status = 'consumed', consumed_at = ?2, consumed_by = ?3
         WHERE code = ?1 AND status = 'active' AND expires_at > ?2",
        params![consumption.code, at, session_id.as_str()],
    )?;
    Ok(changed == 1)
}

/// Deletes codes created before `cutoff` that can no longer be consumed.
pub async fn purge_before(
    db: &Database,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> Result<u64, CurbsideError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM linking_codes
                 WHERE created_at < ?1 AND (status <> 'active' OR expires_at <= ?2)",
                params![ts(cutoff), ts(now)],
            )
        })
        .await
        .map(|n| n as u64)
        .map_err(map_tr_err)
}

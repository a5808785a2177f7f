// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite columns and domain records.
//!
//! Timestamps are stored as RFC 3339 text with millisecond precision and a
//! `Z` suffix, so lexical order matches chronological order in SQL.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use curbside_core::{
    Anchor, ChannelMetadata, Destination, LinkingCode, QueuedOrder, Redemption, RedemptionCode,
    Session, SessionId, StateTimestamps,
};
use rusqlite::Row;
use rusqlite::types::Type;

pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn ts_opt(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(ts)
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

pub(crate) fn get_ts_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_err(idx, e))
}

fn get_enum_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| T::from_str(&raw).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

pub(crate) const SESSION_COLUMNS: &str = "id, idempotency_key, actor_id, destination_id, \
     anchor_latitude, anchor_longitude, anchor_radius_m, state, version, created_at, updated_at, \
     linked_at, en_route_at, arrived_at, completed_at, expired_at, canceled_at, deadline, \
     link_attempts, redemption_code, redemption_expires_at, expiry_reason";

pub(crate) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let redemption_code: Option<String> = row.get(19)?;
    let redemption_expires_at = get_ts_opt(row, 20)?;
    let redemption = match (redemption_code, redemption_expires_at) {
        (Some(code), Some(expires_at)) => Some(Redemption {
            code: RedemptionCode::new(code),
            expires_at,
        }),
        _ => None,
    };

    Ok(Session {
        id: SessionId(row.get(0)?),
        idempotency_key: row.get(1)?,
        actor_id: row.get(2)?,
        destination_id: row.get(3)?,
        anchor: Anchor {
            latitude: row.get(4)?,
            longitude: row.get(5)?,
            radius_m: row.get(6)?,
        },
        state: get_enum(row, 7)?,
        version: row.get(8)?,
        created_at: get_ts(row, 9)?,
        updated_at: get_ts(row, 10)?,
        timestamps: StateTimestamps {
            linked_at: get_ts_opt(row, 11)?,
            en_route_at: get_ts_opt(row, 12)?,
            arrived_at: get_ts_opt(row, 13)?,
            completed_at: get_ts_opt(row, 14)?,
            expired_at: get_ts_opt(row, 15)?,
            canceled_at: get_ts_opt(row, 16)?,
        },
        deadline: get_ts_opt(row, 17)?,
        link_attempts: row.get(18)?,
        redemption,
        expiry_reason: get_enum_opt(row, 21)?,
    })
}

pub(crate) const ORDER_COLUMNS: &str = "id, session_id, destination_id, reference, \
     lead_time_secs, status, created_at, release_at, released_at, estimated_ready_at, \
     acknowledged_at, ready_at, completed_at, canceled_at, dispatch_attempts, next_dispatch_at, \
     last_dispatch_error";

pub(crate) fn order_from_row(row: &Row<'_>) -> rusqlite::Result<QueuedOrder> {
    let lead_time_secs: i64 = row.get(4)?;
    Ok(QueuedOrder {
        id: row.get(0)?,
        session_id: SessionId(row.get(1)?),
        destination_id: row.get(2)?,
        reference: row.get(3)?,
        lead_time_secs: u64::try_from(lead_time_secs).map_err(|e| conversion_err(4, e))?,
        status: get_enum(row, 5)?,
        created_at: get_ts(row, 6)?,
        release_at: get_ts_opt(row, 7)?,
        released_at: get_ts_opt(row, 8)?,
        estimated_ready_at: get_ts_opt(row, 9)?,
        acknowledged_at: get_ts_opt(row, 10)?,
        ready_at: get_ts_opt(row, 11)?,
        completed_at: get_ts_opt(row, 12)?,
        canceled_at: get_ts_opt(row, 13)?,
        dispatch_attempts: row.get(14)?,
        next_dispatch_at: get_ts_opt(row, 15)?,
        last_dispatch_error: row.get(16)?,
    })
}

pub(crate) const LINKING_CODE_COLUMNS: &str =
    "code, channel, device_id, label, status, created_at, expires_at, consumed_at, consumed_by";

pub(crate) fn linking_code_from_row(row: &Row<'_>) -> rusqlite::Result<LinkingCode> {
    let consumed_by: Option<String> = row.get(8)?;
    Ok(LinkingCode {
        code: row.get(0)?,
        channel: ChannelMetadata {
            channel: row.get(1)?,
            device_id: row.get(2)?,
            label: row.get(3)?,
        },
        status: get_enum(row, 4)?,
        created_at: get_ts(row, 5)?,
        expires_at: get_ts(row, 6)?,
        consumed_at: get_ts_opt(row, 7)?,
        consumed_by: consumed_by.map(SessionId),
    })
}

pub(crate) const DESTINATION_COLUMNS: &str =
    "id, name, latitude, longitude, radius_m, approach_secs, recipient";

pub(crate) fn destination_from_row(row: &Row<'_>) -> rusqlite::Result<Destination> {
    let approach_secs: Option<i64> = row.get(5)?;
    Ok(Destination {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        radius_m: row.get(4)?,
        approach_secs: approach_secs
            .map(u64::try_from)
            .transpose()
            .map_err(|e| conversion_err(5, e))?,
        recipient: row.get(6)?,
    })
}

/// Non-terminal states as a SQL list literal.
pub(crate) const ACTIVE_STATES_SQL: &str = "('PENDING', 'LINKED', 'EN_ROUTE', 'ARRIVED')";

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);
        assert!(ts(early) < ts(late));
        assert_eq!(ts(early), "2026-03-01T09:05:00.000Z");
    }
}

// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination catalog.

use curbside_core::{CurbsideError, Destination};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{DESTINATION_COLUMNS, destination_from_row};
use crate::queries::to_i64;

/// Inserts or replaces a destination by id.
pub async fn upsert_destination(
    db: &Database,
    destination: &Destination,
) -> Result<(), CurbsideError> {
    let d = destination.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO destinations (id, name, latitude, longitude, radius_m, approach_secs, recipient)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     latitude = excluded.latitude,
                     longitude = excluded.longitude,
                     radius_m = excluded.radius_m,
                     approach_secs = excluded.approach_secs,
                     recipient = excluded.recipient,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    d.id,
                    d.name,
                    d.latitude,
                    d.longitude,
                    d.radius_m,
                    d.approach_secs.map(to_i64),
                    d.recipient,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_destination(db: &Database, id: &str) -> Result<Option<Destination>, CurbsideError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Destination>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {DESTINATION_COLUMNS} FROM destinations WHERE id = ?1"),
                params![id],
                destination_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

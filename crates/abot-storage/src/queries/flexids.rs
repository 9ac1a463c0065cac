// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport identities.

use abot_core::{AbotError, FlexId, FlexIdKind};
use rusqlite::params;

use crate::database::Database;

/// Record a flex-id seen on an inbound message. Existing rows are untouched.
pub async fn ensure_flexid(db: &Database, flex: &FlexId) -> Result<(), AbotError> {
    let value = flex.value().to_string();
    let kind = flex.kind().code();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO userflexids (flexid, flexidtype) VALUES (?1, ?2)",
                params![value, kind],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All flex-ids bound to a user, oldest first.
pub async fn flexids_for_user(db: &Database, user_id: i64) -> Result<Vec<FlexId>, AbotError> {
    let raw: Vec<(String, i64)> = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT flexid, flexidtype FROM userflexids WHERE userid = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    raw.into_iter()
        .map(|(value, kind)| FlexId::from_parts(value, kind))
        .collect()
}

/// The first phone number bound to a user, used to deliver scheduled events
/// for messages that arrived over other transports.
pub async fn phone_for_user(db: &Database, user_id: i64) -> Result<Option<FlexId>, AbotError> {
    Ok(flexids_for_user(db, user_id)
        .await?
        .into_iter()
        .find(|f| f.kind() == FlexIdKind::Phone))
}

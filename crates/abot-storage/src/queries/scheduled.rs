// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Future-dated outbound messages.

use abot_core::{AbotError, FlexId, ScheduledEvent};
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, SEND_AT_FORMAT};

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledEvent> {
    Ok(ScheduledEvent {
        id: row.get(0)?,
        content: row.get(1)?,
        flexid: row.get(2)?,
        flexidtype: row.get(3)?,
        send_at: row.get(4)?,
        sent: row.get(5)?,
        plugin: row.get(6)?,
    })
}

/// Queue `content` for delivery to `to` at `send_at`. Returns the event id.
pub async fn schedule_event(
    db: &Database,
    content: &str,
    to: &FlexId,
    send_at: NaiveDateTime,
    plugin: &str,
) -> Result<i64, AbotError> {
    let content = content.to_string();
    let flexid = to.value().to_string();
    let flexidtype = to.kind().code();
    let send_at = send_at.format(SEND_AT_FORMAT).to_string();
    let plugin = plugin.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scheduledevents (content, flexid, flexidtype, sendat, pluginname)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![content, flexid, flexidtype, send_at, plugin],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Unsent events whose send time is at or before `now`, oldest first.
pub async fn due_events(
    db: &Database,
    now: NaiveDateTime,
) -> Result<Vec<ScheduledEvent>, AbotError> {
    let now = now.format(SEND_AT_FORMAT).to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, flexid, flexidtype, sendat, sent, pluginname
                 FROM scheduledevents
                 WHERE sent = 0 AND sendat <= ?1
                 ORDER BY sendat ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![now], event_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark an event delivered. Only ever moves `sent` from false to true.
pub async fn mark_sent(db: &Database, id: i64) -> Result<bool, AbotError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE scheduledevents SET sent = 1 WHERE id = ?1 AND sent = 0",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an event by id.
pub async fn get_event(db: &Database, id: i64) -> Result<Option<ScheduledEvent>, AbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, content, flexid, flexidtype, sendat, sent, pluginname
                 FROM scheduledevents WHERE id = ?1",
                params![id],
                event_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log.

use abot_core::{AbotError, FlexId, Msg};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::Database;
use crate::models::{Owner, PreviousRoute, StoredMessage, owner_columns};

/// Messages per conversation page.
pub const PAGE_SIZE: i64 = 30;

const SELECT_COLUMNS: &str = "SELECT id, userid, flexid, flexidtype, sentence, tokens, stems,
        structuredinput, plugin, route, abotsent, needstraining, trained, createdat
     FROM messages";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    let flexid: String = row.get(2)?;
    let flexidtype: i64 = row.get(3)?;
    let tokens: String = row.get(5)?;
    let stems: String = row.get(6)?;
    let structured: String = row.get(7)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        flex_id: if flexid.is_empty() {
            None
        } else {
            FlexId::from_parts(flexid, flexidtype).ok()
        },
        sentence: row.get(4)?,
        tokens: serde_json::from_str(&tokens).unwrap_or_default(),
        stems: serde_json::from_str(&stems).unwrap_or_default(),
        structured_input: serde_json::from_str(&structured).unwrap_or_default(),
        plugin: row.get(8)?,
        route: row.get(9)?,
        abot_sent: row.get(10)?,
        needs_training: row.get(11)?,
        trained: row.get(12)?,
        created_at: row.get(13)?,
    })
}

/// Insert a message. Returns the new id, which is strictly greater than
/// every id inserted before it.
pub async fn insert_message(db: &Database, msg: &Msg) -> Result<i64, AbotError> {
    let user_id = msg.user.as_ref().map(|u| u.id);
    let (flexid, flexidtype) = msg
        .flex_id
        .as_ref()
        .map(|f| (f.value().to_string(), f.kind().code()))
        .unwrap_or_default();
    let tokens = serde_json::to_string(&msg.tokens)?;
    let stems = serde_json::to_string(&msg.stems)?;
    let structured = serde_json::to_string(&msg.structured_input)?;
    let sentence = msg.sentence.clone();
    let plugin = msg.plugin.clone();
    let route = msg.route.clone();
    let abot_sent = msg.abot_sent;
    let needs_training = msg.needs_training;

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (userid, flexid, flexidtype, sentence, tokens, stems,
                    structuredinput, plugin, route, abotsent, needstraining)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    user_id,
                    flexid,
                    flexidtype,
                    sentence,
                    tokens,
                    stems,
                    structured,
                    plugin,
                    route,
                    abot_sent,
                    needs_training,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Plugin and route of the owner's most recent inbound message.
pub async fn last_inbound_route(
    db: &Database,
    owner: &Owner,
) -> Result<Option<PreviousRoute>, AbotError> {
    let owner = owner.clone();
    db.connection()
        .call(move |conn| {
            let row = match &owner {
                Owner::User(id) => conn.query_row(
                    "SELECT plugin, route FROM messages
                     WHERE userid = ?1 AND abotsent = 0
                     ORDER BY id DESC LIMIT 1",
                    params![id],
                    |row| {
                        Ok(PreviousRoute {
                            plugin: row.get(0)?,
                            route: row.get(1)?,
                        })
                    },
                ),
                Owner::Flex(flex) => conn.query_row(
                    "SELECT plugin, route FROM messages
                     WHERE flexid = ?1 AND flexidtype = ?2 AND abotsent = 0
                     ORDER BY id DESC LIMIT 1",
                    params![flex.value(), flex.kind().code()],
                    |row| {
                        Ok(PreviousRoute {
                            plugin: row.get(0)?,
                            route: row.get(1)?,
                        })
                    },
                ),
            };
            row.optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// One page (newest first) of an owner's conversation. Page 0 is the most
/// recent.
pub async fn conversation_page(
    db: &Database,
    owner: &Owner,
    page: u32,
) -> Result<Vec<StoredMessage>, AbotError> {
    let (user_id, flexid, flexidtype) = owner_columns(owner);
    let by_user = matches!(owner, Owner::User(_));
    let offset = i64::from(page) * PAGE_SIZE;
    db.connection()
        .call(move |conn| {
            let sql = if by_user {
                format!("{SELECT_COLUMNS} WHERE userid = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3")
            } else {
                format!(
                    "{SELECT_COLUMNS} WHERE flexid = ?1 AND flexidtype = ?2
                     ORDER BY id DESC LIMIT ?3 OFFSET ?4"
                )
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = if by_user {
                stmt.query_map(params![user_id, PAGE_SIZE, offset], message_from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            } else {
                stmt.query_map(
                    params![flexid, flexidtype, PAGE_SIZE, offset],
                    message_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?
            };
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by id.
pub async fn get_message(db: &Database, id: i64) -> Result<Option<StoredMessage>, AbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flag or unflag a message for human review.
pub async fn set_needs_training(db: &Database, id: i64, value: bool) -> Result<(), AbotError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET needstraining = ?2 WHERE id = ?1",
                params![id, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a message as trained. Clears the review flag.
pub async fn set_trained(db: &Database, id: i64) -> Result<(), AbotError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET trained = 1, needstraining = 0 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages awaiting review, oldest first.
pub async fn needing_training(db: &Database, limit: i64) -> Result<Vec<StoredMessage>, AbotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE needstraining = 1 ORDER BY id ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], message_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

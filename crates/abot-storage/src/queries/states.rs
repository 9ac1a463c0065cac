// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-owner, per-plugin key/value memory.
//!
//! Values are opaque bytes. The core's own context keys are stored under the
//! empty plugin name.

use std::collections::BTreeMap;

use abot_core::AbotError;
use abot_core::rpc::MemoryDelta;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{Owner, owner_columns};

const UPSERT: &str = "INSERT INTO states (userid, flexid, flexidtype, pluginname, key, value)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(userid, flexid, flexidtype, pluginname, key) DO UPDATE SET
        value = excluded.value,
        updatedat = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Read one key.
pub async fn get_state(
    db: &Database,
    owner: &Owner,
    plugin: &str,
    key: &str,
) -> Result<Option<Vec<u8>>, AbotError> {
    let (user_id, flexid, flexidtype) = owner_columns(owner);
    let plugin = plugin.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT value FROM states
                 WHERE userid = ?1 AND flexid = ?2 AND flexidtype = ?3
                   AND pluginname = ?4 AND key = ?5",
                params![user_id, flexid, flexidtype, plugin, key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every key a plugin holds for an owner.
pub async fn plugin_memory(
    db: &Database,
    owner: &Owner,
    plugin: &str,
) -> Result<BTreeMap<String, Vec<u8>>, AbotError> {
    let (user_id, flexid, flexidtype) = owner_columns(owner);
    let plugin = plugin.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value FROM states
                 WHERE userid = ?1 AND flexid = ?2 AND flexidtype = ?3 AND pluginname = ?4",
            )?;
            let rows = stmt.query_map(params![user_id, flexid, flexidtype, plugin], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect::<Result<BTreeMap<_, _>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upsert one key.
pub async fn set_state(
    db: &Database,
    owner: &Owner,
    plugin: &str,
    key: &str,
    value: Vec<u8>,
) -> Result<(), AbotError> {
    let (user_id, flexid, flexidtype) = owner_columns(owner);
    let plugin = plugin.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(UPSERT, params![user_id, flexid, flexidtype, plugin, key, value])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete one key. Missing keys are not an error.
pub async fn delete_state(
    db: &Database,
    owner: &Owner,
    plugin: &str,
    key: &str,
) -> Result<(), AbotError> {
    let (user_id, flexid, flexidtype) = owner_columns(owner);
    let plugin = plugin.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM states
                 WHERE userid = ?1 AND flexid = ?2 AND flexidtype = ?3
                   AND pluginname = ?4 AND key = ?5",
                params![user_id, flexid, flexidtype, plugin, key],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply the memory changes a plugin returned, in one transaction.
///
/// Order: clear, then deletes, then sets.
pub async fn apply_delta(
    db: &Database,
    owner: &Owner,
    plugin: &str,
    delta: &MemoryDelta,
) -> Result<(), AbotError> {
    if delta.is_empty() {
        return Ok(());
    }
    let (user_id, flexid, flexidtype) = owner_columns(owner);
    let plugin = plugin.to_string();
    let delta = delta.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if delta.cleared {
                tx.execute(
                    "DELETE FROM states
                     WHERE userid = ?1 AND flexid = ?2 AND flexidtype = ?3 AND pluginname = ?4",
                    params![user_id, flexid, flexidtype, plugin],
                )?;
            }
            for key in &delta.deleted {
                tx.execute(
                    "DELETE FROM states
                     WHERE userid = ?1 AND flexid = ?2 AND flexidtype = ?3
                       AND pluginname = ?4 AND key = ?5",
                    params![user_id, flexid, flexidtype, plugin, key],
                )?;
            }
            for (key, value) in &delta.set {
                tx.execute(UPSERT, params![user_id, flexid, flexidtype, plugin, key, value])?;
            }
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled in with `embed_migrations!`
//! and applied on every open.

use abot_core::AbotError;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply all pending migrations. Refinery records applied versions in
/// `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), AbotError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(AbotError::storage)?;
    for migration in report.applied_migrations() {
        debug!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}

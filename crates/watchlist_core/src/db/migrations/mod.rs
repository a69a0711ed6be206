//! Ordered schema migrations.
//!
//! Migrations are embedded SQL files applied in version order inside one
//! immediate transaction. The stored version is read again after the write
//! lock is held, so two processes opening the same file never both apply a
//! migration.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, TransactionBehavior};

const MIGRATIONS: &[(u32, &str)] = &[
    (1, include_str!("0001_users_lists.sql")),
    (2, include_str!("0002_invites_relationships.sql")),
];

/// Highest schema version this build knows how to produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Applies every migration newer than the stored schema version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    if is_current(stored_version(conn)?)? {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let stored = stored_version(&tx)?;
    if is_current(stored)? {
        return Ok(());
    }

    for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > stored) {
        tx.execute_batch(sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration { version, source })?;
    }
    tx.commit()?;
    Ok(())
}

/// `Ok(true)` when no migration is pending; an error for future schemas.
fn is_current(stored: u32) -> DbResult<bool> {
    let latest = latest_version();
    if stored > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stored,
            latest_supported: latest,
        });
    }
    Ok(stored == latest)
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

//! Alert (notification feed) repository.

use super::{bool_to_int, parse_bool, RepoError, RepoResult};
use crate::model::alert::{Alert, AlertKind, NewAlert};
use crate::model::{AlertId, UserId};
use rusqlite::{params, Connection, Row};

/// Repository interface for per-user alerts.
pub trait AlertRepository {
    fn insert_alert(&self, alert: &NewAlert, created_at: i64) -> RepoResult<AlertId>;
    fn count_unread(&self, user_id: UserId) -> RepoResult<u64>;
    fn list_alerts(&self, user_id: UserId, limit: u32) -> RepoResult<Vec<Alert>>;
    fn mark_read(&self, user_id: UserId, alert_id: AlertId) -> RepoResult<bool>;
    fn mark_all_read(&self, user_id: UserId) -> RepoResult<u64>;
    /// Deletes all of a user's alerts, or only read ones when `read_only`.
    fn clear(&self, user_id: UserId, read_only: bool) -> RepoResult<u64>;
}

/// SQLite-backed alert repository.
pub struct SqliteAlertRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAlertRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AlertRepository for SqliteAlertRepository<'_> {
    fn insert_alert(&self, alert: &NewAlert, created_at: i64) -> RepoResult<AlertId> {
        self.conn.execute(
            "INSERT INTO alerts (user_id, kind, actor_id, invite_id, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5);",
            params![
                alert.user_id,
                alert.kind.as_str(),
                alert.actor_id,
                alert.invite_id,
                created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn count_unread(&self, user_id: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM alerts WHERE user_id = ?1 AND is_read = 0;",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list_alerts(&self, user_id: UserId, limit: u32) -> RepoResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, kind, actor_id, invite_id, is_read, created_at
             FROM alerts
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![user_id, i64::from(limit)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_alert_row(row)?);
        }
        Ok(items)
    }

    fn mark_read(&self, user_id: UserId, alert_id: AlertId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE alerts SET is_read = ?3 WHERE id = ?1 AND user_id = ?2;",
            params![alert_id, user_id, bool_to_int(true)],
        )?;
        Ok(changed > 0)
    }

    fn mark_all_read(&self, user_id: UserId) -> RepoResult<u64> {
        let changed = self.conn.execute(
            "UPDATE alerts SET is_read = 1 WHERE user_id = ?1 AND is_read = 0;",
            [user_id],
        )?;
        Ok(changed as u64)
    }

    fn clear(&self, user_id: UserId, read_only: bool) -> RepoResult<u64> {
        let changed = self.conn.execute(
            "DELETE FROM alerts WHERE user_id = ?1 AND (?2 = 0 OR is_read = 1);",
            params![user_id, bool_to_int(read_only)],
        )?;
        Ok(changed as u64)
    }
}

fn parse_alert_row(row: &Row<'_>) -> RepoResult<Alert> {
    let kind_text: String = row.get("kind")?;
    let kind = AlertKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid alert kind `{kind_text}` in alerts.kind"))
    })?;
    Ok(Alert {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        kind,
        actor_id: row.get("actor_id")?,
        invite_id: row.get("invite_id")?,
        is_read: parse_bool(row.get("is_read")?, "alerts.is_read")?,
        created_at: row.get("created_at")?,
    })
}

//! Notification surface over the alert feed.

use super::error::{InviteError, InviteResult};
use crate::model::alert::Alert;
use crate::model::{AlertId, UserId};
use crate::repo::alert_repo::{AlertRepository, SqliteAlertRepository};
use log::info;
use rusqlite::Connection;

const DEFAULT_ALERT_PAGE: u32 = 50;

pub struct NotificationService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> NotificationService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn alerts(&self) -> SqliteAlertRepository<'conn> {
        SqliteAlertRepository::new(self.conn)
    }

    pub fn unread_count(&self, user_id: UserId) -> InviteResult<u64> {
        Ok(self.alerts().count_unread(user_id)?)
    }

    /// Newest first. `None` uses the default page size.
    pub fn list_alerts(&self, user_id: UserId, limit: Option<u32>) -> InviteResult<Vec<Alert>> {
        let limit = limit.unwrap_or(DEFAULT_ALERT_PAGE).max(1);
        Ok(self.alerts().list_alerts(user_id, limit)?)
    }

    /// Marks one of `user_id`'s alerts as read. Alerts of other users are
    /// reported as `NotFound`.
    pub fn mark_read(&self, user_id: UserId, alert_id: AlertId) -> InviteResult<()> {
        if self.alerts().mark_read(user_id, alert_id)? {
            Ok(())
        } else {
            Err(InviteError::NotFound)
        }
    }

    /// Returns the number of alerts that changed to read.
    pub fn mark_all_read(&self, user_id: UserId) -> InviteResult<u64> {
        let changed = self.alerts().mark_all_read(user_id)?;
        info!("event=alerts_mark_all_read module=notification status=ok user_id={user_id} count={changed}");
        Ok(changed)
    }

    /// Deletes all of `user_id`'s alerts, or only read ones when `read_only`.
    /// Returns the number deleted.
    pub fn clear(&self, user_id: UserId, read_only: bool) -> InviteResult<u64> {
        let deleted = self.alerts().clear(user_id, read_only)?;
        info!(
            "event=alerts_clear module=notification status=ok user_id={user_id} read_only={read_only} count={deleted}"
        );
        Ok(deleted)
    }
}

//! Account and list setup operations.
//!
//! Identity is owned by an external provider; these operations only keep
//! the local rows that invites and relationships reference.

use super::begin_immediate;
use super::error::{InviteError, InviteResult};
use crate::model::user::{NewUser, User, WatchList};
use crate::model::{ListId, UserId};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use log::info;
use rusqlite::Connection;

pub struct UserService<'conn> {
    conn: &'conn Connection,
    max_list_name_chars: usize,
}

impl<'conn> UserService<'conn> {
    pub fn new(conn: &'conn Connection, max_list_name_chars: usize) -> Self {
        Self {
            conn,
            max_list_name_chars,
        }
    }

    /// Registers a local account row.
    ///
    /// # Errors
    /// `Validation` for a blank or malformed email, a blank display name,
    /// or an email/handle already in use.
    pub fn create_user(&self, user: &NewUser) -> InviteResult<User> {
        let email = user.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(InviteError::Validation("email is malformed".to_string()));
        }
        if user.display_name.trim().is_empty() {
            return Err(InviteError::Validation(
                "display name must not be blank".to_string(),
            ));
        }

        let created = match SqliteUserRepository::new(self.conn).create_user(user) {
            Ok(created) => created,
            Err(err) if err.is_unique_violation_on("users.email") => {
                return Err(InviteError::Validation("email already registered".to_string()))
            }
            Err(err) if err.is_unique_violation_on("users.handle") => {
                return Err(InviteError::Validation("handle already taken".to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            "event=user_create module=user status=ok user_id={} external_auth={}",
            created.id,
            created.authenticates_externally()
        );
        Ok(created)
    }

    pub fn get_user(&self, user_id: UserId) -> InviteResult<User> {
        SqliteUserRepository::new(self.conn)
            .get_user(user_id)?
            .ok_or(InviteError::NotFound)
    }

    /// Creates a list owned by `owner_id`.
    pub fn create_list(&self, owner_id: UserId, name: &str) -> InviteResult<WatchList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InviteError::Validation(
                "list name must not be blank".to_string(),
            ));
        }
        if name.chars().count() > self.max_list_name_chars {
            return Err(InviteError::Validation(format!(
                "list name exceeds {} characters",
                self.max_list_name_chars
            )));
        }

        let tx = begin_immediate(self.conn)?;
        if !SqliteUserRepository::new(&tx).user_exists(owner_id)? {
            return Err(InviteError::NotFound);
        }
        let list = SqliteListRepository::new(&tx).create_list(owner_id, name)?;
        tx.commit()?;
        info!(
            "event=list_create module=user status=ok list_id={} owner_id={owner_id}",
            list.id
        );
        Ok(list)
    }

    pub fn get_list(&self, list_id: ListId) -> InviteResult<WatchList> {
        SqliteListRepository::new(self.conn)
            .get_list(list_id)?
            .ok_or(InviteError::ListNotFound(list_id))
    }

    /// Deletes a list and, by cascade, its collaborator grants. Pending
    /// invites to the list stay pending and fail with `ListNotFound` when
    /// accepted.
    pub fn delete_list(&self, actor_id: UserId, list_id: ListId) -> InviteResult<()> {
        let tx = begin_immediate(self.conn)?;
        let lists = SqliteListRepository::new(&tx);
        let list = lists
            .get_list(list_id)?
            .ok_or(InviteError::ListNotFound(list_id))?;
        if list.owner_id != actor_id {
            return Err(InviteError::Forbidden("only the owner can delete a list"));
        }
        lists.delete_list(list_id)?;
        tx.commit()?;
        info!("event=list_delete module=user status=ok list_id={list_id}");
        Ok(())
    }
}

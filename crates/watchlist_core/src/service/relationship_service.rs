//! Explicit revocation of materialized relationships.
//!
//! # Invariants
//! - Revocation never touches invite rows; accepted invites stay accepted.
//! - A partnership always keeps its friendship edge, so partners cannot
//!   unfriend each other.
//! - Each operation is one immediate transaction.

use super::begin_immediate;
use super::error::{InviteError, InviteResult};
use crate::model::relationship::ListCollaborator;
use crate::model::user::UserSummary;
use crate::model::{ListId, UserId};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
use log::info;
use rusqlite::Connection;

pub struct RelationshipService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> RelationshipService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Friends of `user_id`, ordered by display name.
    pub fn list_friends(&self, user_id: UserId) -> InviteResult<Vec<UserSummary>> {
        Ok(SqliteRelationshipRepository::new(self.conn).list_friends(user_id)?)
    }

    pub fn list_collaborators(&self, list_id: ListId) -> InviteResult<Vec<ListCollaborator>> {
        let lists = SqliteListRepository::new(self.conn);
        if lists.get_list(list_id)?.is_none() {
            return Err(InviteError::ListNotFound(list_id));
        }
        Ok(lists.list_collaborators(list_id)?)
    }

    /// Removes the friendship between `actor_id` and `friend_id`.
    ///
    /// Fails with `Forbidden` while the two are partners and with `NotFound`
    /// when they are not friends.
    pub fn remove_friend(&self, actor_id: UserId, friend_id: UserId) -> InviteResult<()> {
        let tx = begin_immediate(self.conn)?;
        let relationships = SqliteRelationshipRepository::new(&tx);
        if relationships.find_partnership(actor_id, friend_id)?.is_some() {
            return Err(InviteError::Forbidden("partners cannot remove each other as friends"));
        }
        if !relationships.delete_friendship(actor_id, friend_id)? {
            return Err(InviteError::NotFound);
        }
        tx.commit()?;
        info!("event=friend_remove module=relationship status=ok user_id={actor_id}");
        Ok(())
    }

    /// Removes `user_id`'s grant on a list owned by `owner_id`.
    pub fn revoke_collaborator(
        &self,
        owner_id: UserId,
        list_id: ListId,
        user_id: UserId,
    ) -> InviteResult<()> {
        let tx = begin_immediate(self.conn)?;
        let list = SqliteListRepository::new(&tx)
            .get_list(list_id)?
            .ok_or(InviteError::ListNotFound(list_id))?;
        if list.owner_id != owner_id {
            return Err(InviteError::Forbidden("only the owner can revoke access"));
        }
        if !SqliteListRepository::new(&tx).remove_collaborator(list_id, user_id)? {
            return Err(InviteError::NotFound);
        }
        tx.commit()?;
        info!("event=collaborator_revoke module=relationship status=ok list_id={list_id}");
        Ok(())
    }

    /// Drops `user_id`'s own grant on a list. Owners cannot leave their lists.
    pub fn leave_list(&self, user_id: UserId, list_id: ListId) -> InviteResult<()> {
        let tx = begin_immediate(self.conn)?;
        let list = SqliteListRepository::new(&tx)
            .get_list(list_id)?
            .ok_or(InviteError::ListNotFound(list_id))?;
        if list.owner_id == user_id {
            return Err(InviteError::Forbidden("the owner cannot leave their own list"));
        }
        if !SqliteListRepository::new(&tx).remove_collaborator(list_id, user_id)? {
            return Err(InviteError::NotFound);
        }
        tx.commit()?;
        info!("event=list_leave module=relationship status=ok list_id={list_id}");
        Ok(())
    }
}

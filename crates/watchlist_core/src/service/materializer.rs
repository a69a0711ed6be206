//! Relationship materializer: turns an accepted invite into durable rows.
//!
//! # Responsibility
//! - Check, inside the accept transaction, that the relationship does not
//!   already exist and that referenced lists are still present.
//! - Write friendship, partnership (plus shared list) and collaborator rows.
//!
//! # Invariants
//! - Only callable with a connection that is inside the caller's
//!   transaction; nothing here commits.
//! - Partner lists are owned by the inviter; the accepter receives a
//!   `co_owner` collaborator grant, so the owner never has a redundant row.
//! - Accepting a partner invite also ensures the friendship edge.

use super::error::{InviteError, InviteResult};
use crate::model::invite::{Invite, InviteTarget};
use crate::model::relationship::{AccessLevel, RelationshipResult};
use crate::model::{ListId, UserId};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
use log::debug;
use rusqlite::Connection;

pub(crate) struct RelationshipMaterializer<'tx> {
    relationships: SqliteRelationshipRepository<'tx>,
    lists: SqliteListRepository<'tx>,
    default_partner_list_name: &'tx str,
}

impl<'tx> RelationshipMaterializer<'tx> {
    pub(crate) fn new(tx: &'tx Connection, default_partner_list_name: &'tx str) -> Self {
        Self {
            relationships: SqliteRelationshipRepository::new(tx),
            lists: SqliteListRepository::new(tx),
            default_partner_list_name,
        }
    }

    /// Rejects acceptance that would duplicate or dangle.
    pub(crate) fn precheck(&self, invite: &Invite, accepter: UserId) -> InviteResult<()> {
        let inviter = invite.inviter_id;
        match &invite.target {
            InviteTarget::Friend { .. } => {
                if self.relationships.find_friendship(inviter, accepter)?.is_some() {
                    return Err(InviteError::AlreadyConnected);
                }
            }
            InviteTarget::Partner { .. } => {
                if self
                    .relationships
                    .find_partnership(inviter, accepter)?
                    .is_some()
                {
                    return Err(InviteError::AlreadyConnected);
                }
            }
            InviteTarget::ListDirect { list_id, .. } | InviteTarget::ListCode { list_id, .. } => {
                self.ensure_not_on_list(*list_id, accepter)?;
            }
        }
        Ok(())
    }

    /// Fails with `ListNotFound` for a dangling list and `AlreadyConnected`
    /// when `user_id` already owns or collaborates on it.
    pub(crate) fn ensure_not_on_list(&self, list_id: ListId, user_id: UserId) -> InviteResult<()> {
        let list = self
            .lists
            .get_list(list_id)?
            .ok_or(InviteError::ListNotFound(list_id))?;
        if list.owner_id == user_id || self.lists.get_collaborator(list_id, user_id)?.is_some() {
            return Err(InviteError::AlreadyConnected);
        }
        Ok(())
    }

    pub(crate) fn materialize(
        &self,
        invite: &Invite,
        accepter: UserId,
        now_ms: i64,
    ) -> InviteResult<RelationshipResult> {
        let inviter = invite.inviter_id;
        let result = match &invite.target {
            InviteTarget::Friend { .. } => {
                let (friendship, _) = self.relationships.insert_friendship(
                    inviter,
                    accepter,
                    Some(invite.id),
                    now_ms,
                )?;
                RelationshipResult::Friendship {
                    friendship_id: friendship.id,
                    friend_id: inviter,
                }
            }
            InviteTarget::Partner { list_name, .. } => {
                let name = list_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(self.default_partner_list_name);
                let list = self.lists.create_list(inviter, name)?;
                self.lists
                    .insert_collaborator(list.id, accepter, AccessLevel::CoOwner, now_ms)?;
                let partnership = self.relationships.insert_partnership(
                    inviter,
                    accepter,
                    list.id,
                    Some(invite.id),
                    now_ms,
                )?;
                self.relationships
                    .insert_friendship(inviter, accepter, Some(invite.id), now_ms)?;
                RelationshipResult::Partnership {
                    partnership_id: partnership.id,
                    partner_id: inviter,
                    list_id: list.id,
                }
            }
            InviteTarget::ListDirect {
                list_id, access, ..
            }
            | InviteTarget::ListCode { list_id, access } => {
                if self.lists.get_list(*list_id)?.is_none() {
                    return Err(InviteError::ListNotFound(*list_id));
                }
                let grant = self
                    .lists
                    .insert_collaborator(*list_id, accepter, *access, now_ms)?;
                RelationshipResult::ListAccess {
                    list_id: grant.list_id,
                    access: grant.access,
                }
            }
        };

        debug!(
            "event=materialize module=materializer status=ok invite_id={} kind={}",
            invite.id,
            invite.kind().as_str()
        );
        Ok(result)
    }
}

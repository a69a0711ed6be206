//! Read-side access resolver.
//!
//! # Responsibility
//! - Report which list categories a user can see.
//! - Report friends who share a list or partnership with a user.
//! - Search other users by display name or handle.
//!
//! # Invariants
//! - Nothing here writes.
//! - `shared_list_kinds` is an enrichment: failures degrade to an empty
//!   result and are only logged.

use super::error::InviteResult;
use crate::config::SearchConfig;
use crate::model::user::{ListCategory, UserSummary};
use crate::model::UserId;
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use log::{debug, warn};
use rusqlite::Connection;
use serde::Serialize;

/// Friends who share at least one list or partnership with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendsWhoShare {
    pub friends: Vec<UserSummary>,
    pub total: usize,
}

pub struct AccessResolver<'conn> {
    conn: &'conn Connection,
    search: SearchConfig,
}

impl<'conn> AccessResolver<'conn> {
    pub fn new(conn: &'conn Connection, search: SearchConfig) -> Self {
        Self { conn, search }
    }

    /// List categories `user_id` currently has access to, in
    /// `owned, collaborative, partner` order.
    pub fn shared_list_kinds(&self, user_id: UserId) -> Vec<ListCategory> {
        match SqliteListRepository::new(self.conn).list_categories(user_id) {
            Ok(categories) => categories,
            Err(err) => {
                warn!(
                    "event=shared_list_kinds module=access status=degraded user_id={user_id} error={err}"
                );
                Vec::new()
            }
        }
    }

    pub fn friends_who_share(&self, user_id: UserId) -> InviteResult<FriendsWhoShare> {
        let friends = SqliteRelationshipRepository::new(self.conn).friends_who_share(user_id)?;
        let total = friends.len();
        Ok(FriendsWhoShare { friends, total })
    }

    /// Searches users other than `caller_id`.
    ///
    /// Queries shorter than the configured minimum (after trimming) return
    /// an empty result without reading the store.
    pub fn search_users(&self, caller_id: UserId, query: &str) -> InviteResult<Vec<UserSummary>> {
        let query = query.trim();
        if query.chars().count() < self.search.min_query_chars {
            debug!("event=user_search module=access status=skipped reason=short_query");
            return Ok(Vec::new());
        }
        Ok(SqliteUserRepository::new(self.conn).search_users(
            query,
            caller_id,
            self.search.max_results,
        )?)
    }
}

//! Friendship and partnership repository.
//!
//! # Invariants
//! - Pairs are stored ordered (`user_low < user_high`); callers may pass
//!   either order.
//! - At most one friendship and one partnership row per unordered pair.

use super::user_repo::parse_summary_row;
use super::{RepoError, RepoResult};
use crate::model::relationship::{ordered_pair, Friendship, Partnership};
use crate::model::user::UserSummary;
use crate::model::{InviteId, ListId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for pairwise relationships.
pub trait RelationshipRepository {
    fn find_friendship(&self, a: UserId, b: UserId) -> RepoResult<Option<Friendship>>;
    /// Inserts the edge unless it exists. Returns the row and whether it was created.
    fn insert_friendship(
        &self,
        a: UserId,
        b: UserId,
        invite_id: Option<InviteId>,
        created_at: i64,
    ) -> RepoResult<(Friendship, bool)>;
    fn delete_friendship(&self, a: UserId, b: UserId) -> RepoResult<bool>;
    fn list_friends(&self, user_id: UserId) -> RepoResult<Vec<UserSummary>>;
    fn find_partnership(&self, a: UserId, b: UserId) -> RepoResult<Option<Partnership>>;
    fn insert_partnership(
        &self,
        a: UserId,
        b: UserId,
        list_id: ListId,
        invite_id: Option<InviteId>,
        created_at: i64,
    ) -> RepoResult<Partnership>;
    /// Friends of `user_id` who share a list or a partnership with them.
    fn friends_who_share(&self, user_id: UserId) -> RepoResult<Vec<UserSummary>>;
}

/// SQLite-backed relationship repository.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn summaries(&self, sql: &str, user_id: UserId) -> RepoResult<Vec<UserSummary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([user_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_summary_row(row)?);
        }
        Ok(items)
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn find_friendship(&self, a: UserId, b: UserId) -> RepoResult<Option<Friendship>> {
        let (low, high) = ordered_pair(a, b);
        let friendship = self
            .conn
            .query_row(
                "SELECT id, user_low, user_high, created_at
                 FROM friendships
                 WHERE user_low = ?1 AND user_high = ?2;",
                params![low, high],
                |row| {
                    Ok(Friendship {
                        id: row.get("id")?,
                        user_low: row.get("user_low")?,
                        user_high: row.get("user_high")?,
                        created_at: row.get("created_at")?,
                    })
                },
            )
            .optional()?;
        Ok(friendship)
    }

    fn insert_friendship(
        &self,
        a: UserId,
        b: UserId,
        invite_id: Option<InviteId>,
        created_at: i64,
    ) -> RepoResult<(Friendship, bool)> {
        let (low, high) = ordered_pair(a, b);
        let changed = self.conn.execute(
            "INSERT INTO friendships (user_low, user_high, invite_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_low, user_high) DO NOTHING;",
            params![low, high, invite_id, created_at],
        )?;
        let friendship = self
            .find_friendship(low, high)?
            .ok_or_else(|| {
                RepoError::InvalidData(format!("friendship ({low}, {high}) missing after insert"))
            })?;
        Ok((friendship, changed == 1))
    }

    fn delete_friendship(&self, a: UserId, b: UserId) -> RepoResult<bool> {
        let (low, high) = ordered_pair(a, b);
        let changed = self.conn.execute(
            "DELETE FROM friendships WHERE user_low = ?1 AND user_high = ?2;",
            params![low, high],
        )?;
        Ok(changed > 0)
    }

    fn list_friends(&self, user_id: UserId) -> RepoResult<Vec<UserSummary>> {
        self.summaries(
            "SELECT u.id AS id, u.display_name AS display_name, u.handle AS handle
             FROM friendships f
             INNER JOIN users u
                ON u.id = CASE WHEN f.user_low = ?1 THEN f.user_high ELSE f.user_low END
             WHERE f.user_low = ?1 OR f.user_high = ?1
             ORDER BY u.display_name COLLATE NOCASE ASC, u.id ASC;",
            user_id,
        )
    }

    fn find_partnership(&self, a: UserId, b: UserId) -> RepoResult<Option<Partnership>> {
        let (low, high) = ordered_pair(a, b);
        let partnership = self
            .conn
            .query_row(
                "SELECT id, user_low, user_high, list_id, created_at
                 FROM partnerships
                 WHERE user_low = ?1 AND user_high = ?2;",
                params![low, high],
                |row| {
                    Ok(Partnership {
                        id: row.get("id")?,
                        user_low: row.get("user_low")?,
                        user_high: row.get("user_high")?,
                        list_id: row.get("list_id")?,
                        created_at: row.get("created_at")?,
                    })
                },
            )
            .optional()?;
        Ok(partnership)
    }

    fn insert_partnership(
        &self,
        a: UserId,
        b: UserId,
        list_id: ListId,
        invite_id: Option<InviteId>,
        created_at: i64,
    ) -> RepoResult<Partnership> {
        let (low, high) = ordered_pair(a, b);
        self.conn.execute(
            "INSERT INTO partnerships (user_low, user_high, list_id, invite_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![low, high, list_id, invite_id, created_at],
        )?;
        Ok(Partnership {
            id: self.conn.last_insert_rowid(),
            user_low: low,
            user_high: high,
            list_id: Some(list_id),
            created_at,
        })
    }

    fn friends_who_share(&self, user_id: UserId) -> RepoResult<Vec<UserSummary>> {
        self.summaries(
            "WITH friends(friend_id) AS (
                SELECT CASE WHEN user_low = ?1 THEN user_high ELSE user_low END
                FROM friendships
                WHERE user_low = ?1 OR user_high = ?1
            )
            SELECT DISTINCT u.id AS id, u.display_name AS display_name, u.handle AS handle
            FROM friends f
            INNER JOIN users u ON u.id = f.friend_id
            WHERE EXISTS (
                    SELECT 1
                    FROM partnerships p
                    WHERE (p.user_low = ?1 AND p.user_high = f.friend_id)
                       OR (p.user_high = ?1 AND p.user_low = f.friend_id)
                )
               OR EXISTS (
                    SELECT 1
                    FROM lists l
                    WHERE (
                        l.owner_id = ?1
                        AND EXISTS (
                            SELECT 1 FROM list_collaborators c
                            WHERE c.list_id = l.id AND c.user_id = f.friend_id
                        )
                    ) OR (
                        l.owner_id = f.friend_id
                        AND EXISTS (
                            SELECT 1 FROM list_collaborators c
                            WHERE c.list_id = l.id AND c.user_id = ?1
                        )
                    ) OR (
                        EXISTS (
                            SELECT 1 FROM list_collaborators c
                            WHERE c.list_id = l.id AND c.user_id = ?1
                        )
                        AND EXISTS (
                            SELECT 1 FROM list_collaborators c
                            WHERE c.list_id = l.id AND c.user_id = f.friend_id
                        )
                    )
                )
            ORDER BY u.display_name COLLATE NOCASE ASC, u.id ASC;",
            user_id,
        )
    }
}

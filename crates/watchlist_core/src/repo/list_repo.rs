//! List and collaborator-grant repository.
//!
//! # Invariants
//! - One collaborator row per `(list_id, user_id)`.
//! - The owner of a list never has a collaborator row (schema trigger).

use super::{RepoError, RepoResult};
use crate::model::relationship::{AccessLevel, ListCollaborator};
use crate::model::user::{ListCategory, WatchList};
use crate::model::{ListId, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for lists and their collaborator grants.
pub trait ListRepository {
    fn create_list(&self, owner_id: UserId, name: &str) -> RepoResult<WatchList>;
    fn get_list(&self, id: ListId) -> RepoResult<Option<WatchList>>;
    /// Returns `false` when no list had this id.
    fn delete_list(&self, id: ListId) -> RepoResult<bool>;
    fn get_collaborator(
        &self,
        list_id: ListId,
        user_id: UserId,
    ) -> RepoResult<Option<ListCollaborator>>;
    fn insert_collaborator(
        &self,
        list_id: ListId,
        user_id: UserId,
        access: AccessLevel,
        granted_at: i64,
    ) -> RepoResult<ListCollaborator>;
    fn remove_collaborator(&self, list_id: ListId, user_id: UserId) -> RepoResult<bool>;
    fn list_collaborators(&self, list_id: ListId) -> RepoResult<Vec<ListCollaborator>>;
    /// Categories of list access `user_id` currently holds, sorted.
    fn list_categories(&self, user_id: UserId) -> RepoResult<Vec<ListCategory>>;
}

/// SQLite-backed list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(&self, owner_id: UserId, name: &str) -> RepoResult<WatchList> {
        self.conn.execute(
            "INSERT INTO lists (owner_id, name) VALUES (?1, ?2);",
            params![owner_id, name],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_list(id)?
            .ok_or(RepoError::NotFound { entity: "list", id })
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<WatchList>> {
        let list = self
            .conn
            .query_row(
                "SELECT id, owner_id, name, created_at FROM lists WHERE id = ?1;",
                [id],
                |row| {
                    Ok(WatchList {
                        id: row.get("id")?,
                        owner_id: row.get("owner_id")?,
                        name: row.get("name")?,
                        created_at: row.get("created_at")?,
                    })
                },
            )
            .optional()?;
        Ok(list)
    }

    fn delete_list(&self, id: ListId) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM lists WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn get_collaborator(
        &self,
        list_id: ListId,
        user_id: UserId,
    ) -> RepoResult<Option<ListCollaborator>> {
        let mut stmt = self.conn.prepare(
            "SELECT list_id, user_id, access_level, granted_at
             FROM list_collaborators
             WHERE list_id = ?1 AND user_id = ?2;",
        )?;
        let mut rows = stmt.query(params![list_id, user_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_collaborator_row(row)?));
        }
        Ok(None)
    }

    fn insert_collaborator(
        &self,
        list_id: ListId,
        user_id: UserId,
        access: AccessLevel,
        granted_at: i64,
    ) -> RepoResult<ListCollaborator> {
        self.conn.execute(
            "INSERT INTO list_collaborators (list_id, user_id, access_level, granted_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![list_id, user_id, access.as_str(), granted_at],
        )?;
        Ok(ListCollaborator {
            list_id,
            user_id,
            access,
            granted_at,
        })
    }

    fn remove_collaborator(&self, list_id: ListId, user_id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM list_collaborators WHERE list_id = ?1 AND user_id = ?2;",
            params![list_id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn list_collaborators(&self, list_id: ListId) -> RepoResult<Vec<ListCollaborator>> {
        let mut stmt = self.conn.prepare(
            "SELECT list_id, user_id, access_level, granted_at
             FROM list_collaborators
             WHERE list_id = ?1
             ORDER BY granted_at ASC, user_id ASC;",
        )?;
        let mut rows = stmt.query([list_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_collaborator_row(row)?);
        }
        Ok(items)
    }

    fn list_categories(&self, user_id: UserId) -> RepoResult<Vec<ListCategory>> {
        // Partner lists are reported only as `Partner`, never as `Collaborative`.
        let (owned, collaborative, partner): (i64, i64, i64) = self.conn.query_row(
            "SELECT
                EXISTS(SELECT 1 FROM lists WHERE owner_id = ?1),
                EXISTS(
                    SELECT 1
                    FROM list_collaborators c
                    INNER JOIN lists l ON l.id = c.list_id
                    WHERE (c.user_id = ?1 OR l.owner_id = ?1)
                      AND NOT EXISTS (SELECT 1 FROM partnerships p WHERE p.list_id = l.id)
                ),
                EXISTS(
                    SELECT 1
                    FROM partnerships
                    WHERE (user_low = ?1 OR user_high = ?1)
                      AND list_id IS NOT NULL
                );",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut categories = Vec::new();
        if owned == 1 {
            categories.push(ListCategory::Owned);
        }
        if collaborative == 1 {
            categories.push(ListCategory::Collaborative);
        }
        if partner == 1 {
            categories.push(ListCategory::Partner);
        }
        Ok(categories)
    }
}

fn parse_collaborator_row(row: &Row<'_>) -> RepoResult<ListCollaborator> {
    let access_text: String = row.get("access_level")?;
    let access = AccessLevel::parse(&access_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid access level `{access_text}` in list_collaborators.access_level"
        ))
    })?;
    Ok(ListCollaborator {
        list_id: row.get("list_id")?,
        user_id: row.get("user_id")?,
        access,
        granted_at: row.get("granted_at")?,
    })
}

//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Email uniqueness is case-insensitive and enforced by the schema.
//! - Search never returns the caller.

use super::{escape_like, RepoError, RepoResult};
use crate::model::user::{NewUser, User, UserSummary};
use crate::model::UserId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    password_hash,
    display_name,
    handle,
    created_at
FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn user_exists(&self, id: UserId) -> RepoResult<bool>;
    /// Substring match on display name or handle, excluding `exclude`.
    fn search_users(
        &self,
        query: &str,
        exclude: UserId,
        limit: u32,
    ) -> RepoResult<Vec<UserSummary>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        self.conn.execute(
            "INSERT INTO users (email, password_hash, display_name, handle)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                user.email.trim(),
                user.password_hash.as_deref(),
                user.display_name.trim(),
                user.handle.as_deref().map(str::trim),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or(RepoError::NotFound { entity: "user", id })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn user_exists(&self, id: UserId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM users WHERE id = ?1;", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn search_users(
        &self,
        query: &str,
        exclude: UserId,
        limit: u32,
    ) -> RepoResult<Vec<UserSummary>> {
        let pattern = format!("%{}%", escape_like(query));
        let prefix = format!("{}%", escape_like(query));
        let mut stmt = self.conn.prepare(
            "SELECT id, display_name, handle
             FROM users
             WHERE id <> ?1
               AND (
                 display_name LIKE ?2 ESCAPE '\\'
                 OR handle LIKE ?2 ESCAPE '\\'
               )
             ORDER BY
               CASE
                 WHEN display_name LIKE ?3 ESCAPE '\\' OR handle LIKE ?3 ESCAPE '\\' THEN 0
                 ELSE 1
               END,
               display_name COLLATE NOCASE ASC,
               id ASC
             LIMIT ?4;",
        )?;
        let mut rows = stmt.query(params![exclude, pattern, prefix, i64::from(limit)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_summary_row(row)?);
        }
        Ok(items)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        display_name: row.get("display_name")?,
        handle: row.get("handle")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn parse_summary_row(row: &Row<'_>) -> RepoResult<UserSummary> {
    Ok(UserSummary {
        id: row.get("id")?,
        display_name: row.get("display_name")?,
        handle: row.get("handle")?,
    })
}

//! Invite store: persistence and indexed lookups for every invite kind.
//!
//! # Responsibility
//! - Map `Invite`/`InviteTarget` to the single `invites` table.
//! - Provide the kind-specific lookups used by the lifecycle engine.
//! - Apply lazy expiry (`pending` → `expired`) for a bounded scope.
//!
//! # Invariants
//! - Status changes only through `resolve_pending`/`expire_overdue`, both of
//!   which require the row to still be `pending` (optimistic status check).
//! - Pending uniqueness per `(inviter_id, kind, target_key)` and per
//!   `(kind, code)` is enforced by partial unique indexes.

use super::{RepoError, RepoResult};
use crate::model::invite::{Invite, InviteKind, InviteStatus, InviteTarget};
use crate::model::relationship::AccessLevel;
use crate::model::{InviteId, ListId, UserId};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

const INVITE_SELECT_SQL: &str = "SELECT
    id,
    kind,
    inviter_id,
    target_user_id,
    target_list_id,
    code,
    status,
    metadata,
    created_at,
    expires_at,
    resolved_at
FROM invites";

/// Kind-specific fields that have no column of their own.
#[derive(Debug, Default, Serialize, Deserialize)]
struct InviteMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<AccessLevel>,
}

/// Row to insert as a fresh pending invite.
#[derive(Debug, Clone, Copy)]
pub struct InviteInsert<'a> {
    pub inviter_id: UserId,
    pub target: &'a InviteTarget,
    pub code: &'a str,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

/// Rows considered by one lazy-expiry pass.
#[derive(Debug, Clone, Copy)]
pub enum ExpiryScope<'a> {
    Invite(InviteId),
    Code {
        kind: InviteKind,
        code: &'a str,
    },
    Tuple {
        inviter_id: UserId,
        kind: InviteKind,
        target_key: &'a str,
    },
    /// Invites sent by or targeted at this user.
    User(UserId),
}

/// Repository interface for invite persistence.
pub trait InviteRepository {
    fn insert_invite(&self, invite: &InviteInsert<'_>) -> RepoResult<Invite>;
    fn get_invite(&self, id: InviteId) -> RepoResult<Option<Invite>>;
    fn find_pending_by_code(&self, kind: InviteKind, code: &str) -> RepoResult<Option<Invite>>;
    /// Pending row for the code if any, otherwise the most recent resolved one.
    fn find_by_code(&self, kind: InviteKind, code: &str) -> RepoResult<Option<Invite>>;
    fn find_pending_between(
        &self,
        inviter_id: UserId,
        kind: InviteKind,
        target_key: &str,
    ) -> RepoResult<Option<Invite>>;
    /// Invites created by `user_id`, newest first, optionally filtered by status.
    fn list_sent_by(
        &self,
        user_id: UserId,
        status: Option<InviteStatus>,
    ) -> RepoResult<Vec<Invite>>;
    /// Pending invites that name `user_id` as recipient, newest first.
    fn list_pending_for(&self, user_id: UserId) -> RepoResult<Vec<Invite>>;
    /// Moves a pending invite to `status`. Returns `false` when the row was
    /// no longer pending.
    fn resolve_pending(
        &self,
        id: InviteId,
        status: InviteStatus,
        resolved_at: i64,
    ) -> RepoResult<bool>;
    /// Marks overdue pending invites in `scope` as expired; returns the count.
    fn expire_overdue(&self, scope: ExpiryScope<'_>, now_ms: i64) -> RepoResult<usize>;
    /// Cancels other pending invites of `kind` targeted between `a` and `b`
    /// in either direction.
    fn cancel_pending_between(
        &self,
        kind: InviteKind,
        a: UserId,
        b: UserId,
        except: InviteId,
        resolved_at: i64,
    ) -> RepoResult<usize>;
    /// Cancels other pending direct invites granting `user_id` access to `list_id`.
    fn cancel_pending_list_invites_for(
        &self,
        list_id: ListId,
        user_id: UserId,
        except: InviteId,
        resolved_at: i64,
    ) -> RepoResult<usize>;
}

/// SQLite-backed invite repository.
pub struct SqliteInviteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInviteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Option<Invite>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_invite_row(row)?));
        }
        Ok(None)
    }

    fn query_many(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Invite>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_invite_row(row)?);
        }
        Ok(items)
    }
}

impl InviteRepository for SqliteInviteRepository<'_> {
    fn insert_invite(&self, invite: &InviteInsert<'_>) -> RepoResult<Invite> {
        let target = invite.target;
        let metadata = encode_metadata(target)?;
        self.conn.execute(
            "INSERT INTO invites (
                kind,
                inviter_id,
                target_user_id,
                target_list_id,
                target_key,
                code,
                status,
                metadata,
                created_at,
                expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8, ?9);",
            params![
                target.kind().as_str(),
                invite.inviter_id,
                target.user_id(),
                target.list_id(),
                target.target_key(),
                invite.code,
                metadata,
                invite.created_at,
                invite.expires_at,
            ],
        )?;

        Ok(Invite {
            id: self.conn.last_insert_rowid(),
            inviter_id: invite.inviter_id,
            target: target.clone(),
            code: invite.code.to_string(),
            status: InviteStatus::Pending,
            created_at: invite.created_at,
            expires_at: invite.expires_at,
            resolved_at: None,
        })
    }

    fn get_invite(&self, id: InviteId) -> RepoResult<Option<Invite>> {
        self.query_one(&format!("{INVITE_SELECT_SQL} WHERE id = ?1;"), [id])
    }

    fn find_pending_by_code(&self, kind: InviteKind, code: &str) -> RepoResult<Option<Invite>> {
        self.query_one(
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE kind = ?1 AND code = ?2 AND status = 'pending';"
            ),
            params![kind.as_str(), code],
        )
    }

    fn find_by_code(&self, kind: InviteKind, code: &str) -> RepoResult<Option<Invite>> {
        self.query_one(
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE kind = ?1 AND code = ?2
                 ORDER BY (status = 'pending') DESC, created_at DESC, id DESC
                 LIMIT 1;"
            ),
            params![kind.as_str(), code],
        )
    }

    fn find_pending_between(
        &self,
        inviter_id: UserId,
        kind: InviteKind,
        target_key: &str,
    ) -> RepoResult<Option<Invite>> {
        self.query_one(
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE inviter_id = ?1
                   AND kind = ?2
                   AND target_key = ?3
                   AND status = 'pending';"
            ),
            params![inviter_id, kind.as_str(), target_key],
        )
    }

    fn list_sent_by(
        &self,
        user_id: UserId,
        status: Option<InviteStatus>,
    ) -> RepoResult<Vec<Invite>> {
        self.query_many(
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE inviter_id = ?1
                   AND (?2 IS NULL OR status = ?2)
                 ORDER BY created_at DESC, id DESC;"
            ),
            params![user_id, status.map(InviteStatus::as_str)],
        )
    }

    fn list_pending_for(&self, user_id: UserId) -> RepoResult<Vec<Invite>> {
        self.query_many(
            &format!(
                "{INVITE_SELECT_SQL}
                 WHERE target_user_id = ?1
                   AND status = 'pending'
                 ORDER BY created_at DESC, id DESC;"
            ),
            [user_id],
        )
    }

    fn resolve_pending(
        &self,
        id: InviteId,
        status: InviteStatus,
        resolved_at: i64,
    ) -> RepoResult<bool> {
        if !status.is_terminal() {
            return Err(RepoError::InvalidData(format!(
                "invite {id} cannot be resolved to non-terminal status `{}`",
                status.as_str()
            )));
        }
        let changed = self.conn.execute(
            "UPDATE invites
             SET status = ?2,
                 resolved_at = ?3
             WHERE id = ?1
               AND status = 'pending';",
            params![id, status.as_str(), resolved_at],
        )?;
        Ok(changed == 1)
    }

    fn expire_overdue(&self, scope: ExpiryScope<'_>, now_ms: i64) -> RepoResult<usize> {
        const EXPIRE_SQL: &str = "UPDATE invites
             SET status = 'expired',
                 resolved_at = ?1
             WHERE status = 'pending'
               AND expires_at IS NOT NULL
               AND expires_at <= ?1";

        let changed = match scope {
            ExpiryScope::Invite(id) => self
                .conn
                .execute(&format!("{EXPIRE_SQL} AND id = ?2;"), params![now_ms, id])?,
            ExpiryScope::Code { kind, code } => self.conn.execute(
                &format!("{EXPIRE_SQL} AND kind = ?2 AND code = ?3;"),
                params![now_ms, kind.as_str(), code],
            )?,
            ExpiryScope::Tuple {
                inviter_id,
                kind,
                target_key,
            } => self.conn.execute(
                &format!("{EXPIRE_SQL} AND inviter_id = ?2 AND kind = ?3 AND target_key = ?4;"),
                params![now_ms, inviter_id, kind.as_str(), target_key],
            )?,
            ExpiryScope::User(user_id) => self.conn.execute(
                &format!("{EXPIRE_SQL} AND (inviter_id = ?2 OR target_user_id = ?2);"),
                params![now_ms, user_id],
            )?,
        };
        Ok(changed)
    }

    fn cancel_pending_between(
        &self,
        kind: InviteKind,
        a: UserId,
        b: UserId,
        except: InviteId,
        resolved_at: i64,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE invites
             SET status = 'cancelled',
                 resolved_at = ?5
             WHERE status = 'pending'
               AND kind = ?1
               AND id <> ?4
               AND (
                 (inviter_id = ?2 AND target_user_id = ?3)
                 OR (inviter_id = ?3 AND target_user_id = ?2)
               );",
            params![kind.as_str(), a, b, except, resolved_at],
        )?;
        Ok(changed)
    }

    fn cancel_pending_list_invites_for(
        &self,
        list_id: ListId,
        user_id: UserId,
        except: InviteId,
        resolved_at: i64,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE invites
             SET status = 'cancelled',
                 resolved_at = ?4
             WHERE status = 'pending'
               AND kind = 'list_direct'
               AND target_list_id = ?1
               AND target_user_id = ?2
               AND id <> ?3;",
            params![list_id, user_id, except, resolved_at],
        )?;
        Ok(changed)
    }
}

fn encode_metadata(target: &InviteTarget) -> RepoResult<Option<String>> {
    let metadata = match target {
        InviteTarget::Friend { .. } => return Ok(None),
        InviteTarget::Partner { list_name, .. } => InviteMetadata {
            list_name: list_name.clone(),
            access: None,
        },
        InviteTarget::ListDirect { access, .. } | InviteTarget::ListCode { access, .. } => {
            InviteMetadata {
                list_name: None,
                access: Some(*access),
            }
        }
    };
    serde_json::to_string(&metadata)
        .map(Some)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode invite metadata: {err}")))
}

fn parse_invite_row(row: &Row<'_>) -> RepoResult<Invite> {
    let id: InviteId = row.get("id")?;

    let kind_text: String = row.get("kind")?;
    let kind = InviteKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid invite kind `{kind_text}` in invites.kind"))
    })?;

    let status_text: String = row.get("status")?;
    let status = InviteStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid invite status `{status_text}` in invites.status"
        ))
    })?;

    let metadata = match row.get::<_, Option<String>>("metadata")? {
        Some(raw) => serde_json::from_str::<InviteMetadata>(&raw).map_err(|err| {
            RepoError::InvalidData(format!("invalid metadata for invite {id}: {err}"))
        })?,
        None => InviteMetadata::default(),
    };

    let target_user_id: Option<UserId> = row.get("target_user_id")?;
    let target_list_id: Option<ListId> = row.get("target_list_id")?;
    let missing = |column: &str| {
        RepoError::InvalidData(format!(
            "invite {id} of kind `{kind_text}` is missing invites.{column}"
        ))
    };
    let access = metadata.access.unwrap_or(AccessLevel::Editor);

    let target = match kind {
        InviteKind::Friend => InviteTarget::Friend {
            user_id: target_user_id,
        },
        InviteKind::Partner => InviteTarget::Partner {
            user_id: target_user_id,
            list_name: metadata.list_name,
        },
        InviteKind::ListDirect => InviteTarget::ListDirect {
            list_id: target_list_id.ok_or_else(|| missing("target_list_id"))?,
            user_id: target_user_id.ok_or_else(|| missing("target_user_id"))?,
            access,
        },
        InviteKind::ListCode => InviteTarget::ListCode {
            list_id: target_list_id.ok_or_else(|| missing("target_list_id"))?,
            access,
        },
    };

    Ok(Invite {
        id,
        inviter_id: row.get("inviter_id")?,
        target,
        code: row.get("code")?,
        status,
        created_at: row.get("created_at")?,
        expires_at: row.get("expires_at")?,
        resolved_at: row.get("resolved_at")?,
    })
}

//! Invite lifecycle engine.
//!
//! # Responsibility
//! - Create, accept, decline and cancel invites of every kind through one
//!   state machine (`pending` → `accepted | declined | cancelled | expired`).
//! - Run acceptance and materialization as one atomic unit.
//! - Apply lazy expiry at the top of every operation that reads invites.
//!
//! # Invariants
//! - Every operation runs in one `BEGIN IMMEDIATE` transaction: validation
//!   reads and the status write cannot interleave with another writer.
//! - The only state committed by a failed operation is the
//!   `pending` → `expired` rewrite, which is idempotent.
//! - Alerts are inserted in the same transaction as the transition that
//!   produced them and pushed to the optional sink only after commit.

use super::alert_sink::{dispatch_best_effort, AlertSink};
use super::begin_immediate;
use super::error::{InviteError, InviteResult};
use super::materializer::RelationshipMaterializer;
use crate::clock::{Clock, SystemClock};
use crate::code::{CodeGenerator, CodeSource};
use crate::config::{ConfigError, InviteConfig};
use crate::model::alert::{AlertKind, NewAlert};
use crate::model::invite::{
    Invite, InviteKind, InviteRef, InviteStatus, InviteTarget, NewInvite,
};
use crate::model::relationship::{AccessLevel, RelationshipResult};
use crate::model::{InviteId, UserId};
use crate::repo::alert_repo::{AlertRepository, SqliteAlertRepository};
use crate::repo::invite_repo::{
    ExpiryScope, InviteInsert, InviteRepository, SqliteInviteRepository,
};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoError;
use log::{error, info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    pub invite_id: InviteId,
    pub kind: InviteKind,
    pub inviter_id: UserId,
    #[serde(flatten)]
    pub relationship: RelationshipResult,
}

/// Invite loaded for a recipient transition.
enum Loaded {
    Ready(Invite),
    /// Past its deadline; the `expired` rewrite must be committed.
    Expired(InviteId),
}

/// Lifecycle engine over one connection.
pub struct InviteService<'conn> {
    conn: &'conn Connection,
    config: InviteConfig,
    codes: Arc<dyn CodeSource>,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn AlertSink>>,
}

impl<'conn> InviteService<'conn> {
    /// Builds the engine over `conn`.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` when `config` fails validation, such as
    /// a code space below the minimum byte count.
    pub fn new(conn: &'conn Connection, config: InviteConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let codes = Arc::new(CodeGenerator::new(config.code_bytes));
        Ok(Self {
            conn,
            config,
            codes,
            clock: Arc::new(SystemClock),
            sink: None,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_code_source(mut self, codes: Arc<dyn CodeSource>) -> Self {
        self.codes = codes;
        self
    }

    /// Pushes alerts produced by committed transitions to `sink`.
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Creates a pending invite with a fresh code.
    ///
    /// # Errors
    /// - `Validation` for malformed targets or expiry.
    /// - `Forbidden` for self-targeted invites or lists the inviter cannot share.
    /// - `NotFound` when the inviter or target user does not exist.
    /// - `ListNotFound` when the target list does not exist.
    /// - `AlreadyConnected` when the targeted user is already connected.
    /// - `DuplicatePending` when an active pending invite has the same
    ///   (inviter, target, kind).
    pub fn create(&self, inviter_id: UserId, request: NewInvite) -> InviteResult<Invite> {
        let started_at = Instant::now();
        let result = self.create_inner(inviter_id, request);
        log_outcome("invite_create", started_at, &result, |invite| {
            (invite.id, invite.kind())
        });
        if let Ok(invite) = &result {
            if let Some(target_user) = invite.target.user_id() {
                self.dispatch(NewAlert {
                    user_id: target_user,
                    kind: AlertKind::InviteReceived,
                    actor_id: Some(invite.inviter_id),
                    invite_id: Some(invite.id),
                });
            }
        }
        result
    }

    /// Accepts a pending invite and materializes its relationship.
    ///
    /// # Errors
    /// `NotFound`, `Expired`, `Forbidden`, `AlreadyResolved`,
    /// `AlreadyConnected`, `ListNotFound`, `Validation`, or `Store`.
    pub fn accept(&self, actor_id: UserId, invite: &InviteRef) -> InviteResult<Acceptance> {
        let started_at = Instant::now();
        let result = self.accept_inner(actor_id, invite);
        log_outcome("invite_accept", started_at, &result, |acceptance| {
            (acceptance.invite_id, acceptance.kind)
        });
        if let Ok(acceptance) = &result {
            self.dispatch(NewAlert {
                user_id: acceptance.inviter_id,
                kind: AlertKind::InviteAccepted,
                actor_id: Some(actor_id),
                invite_id: Some(acceptance.invite_id),
            });
        }
        result
    }

    /// Declines a pending invite addressed to `actor_id`.
    pub fn decline(&self, actor_id: UserId, invite: &InviteRef) -> InviteResult<Invite> {
        let started_at = Instant::now();
        let result = self.decline_inner(actor_id, invite);
        log_outcome("invite_decline", started_at, &result, |invite| {
            (invite.id, invite.kind())
        });
        if let Ok(invite) = &result {
            self.dispatch(NewAlert {
                user_id: invite.inviter_id,
                kind: AlertKind::InviteDeclined,
                actor_id: Some(actor_id),
                invite_id: Some(invite.id),
            });
        }
        result
    }

    /// Revokes a pending invite. Only the inviter may cancel.
    pub fn cancel(&self, actor_id: UserId, invite_id: InviteId) -> InviteResult<Invite> {
        let started_at = Instant::now();
        let result = self.cancel_inner(actor_id, invite_id);
        log_outcome("invite_cancel", started_at, &result, |invite| {
            (invite.id, invite.kind())
        });
        result
    }

    /// Looks up an invite by code for preview, after lazy expiry.
    pub fn get_by_code(&self, kind: InviteKind, code: &str) -> InviteResult<Invite> {
        self.validate_code(code)?;
        let now_ms = self.clock.now_ms();
        let tx = begin_immediate(self.conn)?;
        let invite = {
            let invites = SqliteInviteRepository::new(&tx);
            invites.expire_overdue(ExpiryScope::Code { kind, code }, now_ms)?;
            invites.find_by_code(kind, code)?
        };
        tx.commit()?;
        invite.ok_or(InviteError::NotFound)
    }

    /// Invites sent by `actor_id`, newest first. Pending only unless
    /// `include_resolved`.
    pub fn list_sent(&self, actor_id: UserId, include_resolved: bool) -> InviteResult<Vec<Invite>> {
        let now_ms = self.clock.now_ms();
        let tx = begin_immediate(self.conn)?;
        let items = {
            let invites = SqliteInviteRepository::new(&tx);
            invites.expire_overdue(ExpiryScope::User(actor_id), now_ms)?;
            let status = (!include_resolved).then_some(InviteStatus::Pending);
            invites.list_sent_by(actor_id, status)?
        };
        tx.commit()?;
        Ok(items)
    }

    /// Pending invites addressed to `actor_id`, newest first.
    pub fn list_pending_for(&self, actor_id: UserId) -> InviteResult<Vec<Invite>> {
        let now_ms = self.clock.now_ms();
        let tx = begin_immediate(self.conn)?;
        let items = {
            let invites = SqliteInviteRepository::new(&tx);
            invites.expire_overdue(ExpiryScope::User(actor_id), now_ms)?;
            invites.list_pending_for(actor_id)?
        };
        tx.commit()?;
        Ok(items)
    }

    fn create_inner(&self, inviter_id: UserId, request: NewInvite) -> InviteResult<Invite> {
        let now_ms = self.clock.now_ms();
        let target = self.normalize_target(inviter_id, request.target)?;
        let expires_at = match request.expires_at {
            Some(explicit) => explicit,
            None => self
                .config
                .default_ttl_ms
                .map(|ttl| now_ms.saturating_add(ttl)),
        };
        if expires_at.is_some_and(|expires_at| expires_at <= now_ms) {
            return Err(InviteError::Validation(
                "expiry must be in the future".to_string(),
            ));
        }

        let tx = begin_immediate(self.conn)?;
        let users = SqliteUserRepository::new(&tx);
        if !users.user_exists(inviter_id)? {
            return Err(InviteError::NotFound);
        }
        if let Some(target_user) = target.user_id() {
            if !users.user_exists(target_user)? {
                return Err(InviteError::NotFound);
            }
        }
        self.ensure_can_invite(&tx, inviter_id, &target)?;

        let invites = SqliteInviteRepository::new(&tx);
        let kind = target.kind();
        let target_key = target.target_key();
        invites.expire_overdue(
            ExpiryScope::Tuple {
                inviter_id,
                kind,
                target_key: &target_key,
            },
            now_ms,
        )?;
        if let Some(existing) = invites.find_pending_between(inviter_id, kind, &target_key)? {
            return Err(InviteError::DuplicatePending(Some(existing.id)));
        }

        let invite =
            self.insert_with_fresh_code(&invites, inviter_id, &target, now_ms, expires_at)?;

        if let Some(target_user) = target.user_id() {
            SqliteAlertRepository::new(&tx).insert_alert(
                &NewAlert {
                    user_id: target_user,
                    kind: AlertKind::InviteReceived,
                    actor_id: Some(inviter_id),
                    invite_id: Some(invite.id),
                },
                now_ms,
            )?;
        }

        tx.commit()?;
        Ok(invite)
    }

    fn accept_inner(&self, actor_id: UserId, invite_ref: &InviteRef) -> InviteResult<Acceptance> {
        self.validate_ref(invite_ref)?;
        let now_ms = self.clock.now_ms();
        let tx = begin_immediate(self.conn)?;

        let loaded = load_for_recipient(
            &SqliteInviteRepository::new(&tx),
            actor_id,
            invite_ref,
            now_ms,
        )?;
        let invite = match loaded {
            Loaded::Ready(invite) => invite,
            Loaded::Expired(id) => {
                tx.commit()?;
                return Err(InviteError::Expired(id));
            }
        };

        let invites = SqliteInviteRepository::new(&tx);
        let materializer =
            RelationshipMaterializer::new(&tx, &self.config.default_partner_list_name);
        materializer.precheck(&invite, actor_id)?;

        if !invites.resolve_pending(invite.id, InviteStatus::Accepted, now_ms)? {
            return Err(InviteError::AlreadyResolved {
                id: invite.id,
                status: invite.status,
            });
        }
        let relationship = materializer.materialize(&invite, actor_id, now_ms)?;

        match &invite.target {
            InviteTarget::Friend { .. } | InviteTarget::Partner { .. } => {
                invites.cancel_pending_between(
                    invite.kind(),
                    invite.inviter_id,
                    actor_id,
                    invite.id,
                    now_ms,
                )?;
            }
            InviteTarget::ListDirect { list_id, .. } | InviteTarget::ListCode { list_id, .. } => {
                invites.cancel_pending_list_invites_for(*list_id, actor_id, invite.id, now_ms)?;
            }
        }

        SqliteAlertRepository::new(&tx).insert_alert(
            &NewAlert {
                user_id: invite.inviter_id,
                kind: AlertKind::InviteAccepted,
                actor_id: Some(actor_id),
                invite_id: Some(invite.id),
            },
            now_ms,
        )?;

        tx.commit()?;
        Ok(Acceptance {
            invite_id: invite.id,
            kind: invite.kind(),
            inviter_id: invite.inviter_id,
            relationship,
        })
    }

    fn decline_inner(&self, actor_id: UserId, invite_ref: &InviteRef) -> InviteResult<Invite> {
        self.validate_ref(invite_ref)?;
        let now_ms = self.clock.now_ms();
        let tx = begin_immediate(self.conn)?;

        let loaded = load_for_recipient(
            &SqliteInviteRepository::new(&tx),
            actor_id,
            invite_ref,
            now_ms,
        )?;
        let mut invite = match loaded {
            Loaded::Ready(invite) => invite,
            Loaded::Expired(id) => {
                tx.commit()?;
                return Err(InviteError::Expired(id));
            }
        };

        let invites = SqliteInviteRepository::new(&tx);
        if !invites.resolve_pending(invite.id, InviteStatus::Declined, now_ms)? {
            return Err(InviteError::AlreadyResolved {
                id: invite.id,
                status: invite.status,
            });
        }
        SqliteAlertRepository::new(&tx).insert_alert(
            &NewAlert {
                user_id: invite.inviter_id,
                kind: AlertKind::InviteDeclined,
                actor_id: Some(actor_id),
                invite_id: Some(invite.id),
            },
            now_ms,
        )?;

        tx.commit()?;
        invite.status = InviteStatus::Declined;
        invite.resolved_at = Some(now_ms);
        Ok(invite)
    }

    fn cancel_inner(&self, actor_id: UserId, invite_id: InviteId) -> InviteResult<Invite> {
        self.validate_ref(&InviteRef::Id(invite_id))?;
        let now_ms = self.clock.now_ms();
        let tx = begin_immediate(self.conn)?;

        let (mut invite, expired) = {
            let invites = SqliteInviteRepository::new(&tx);
            let mut invite = invites.get_invite(invite_id)?.ok_or(InviteError::NotFound)?;
            // A stored `expired` status is terminal and falls through to
            // `ensure_pending`; only this call's rewrite reports `Expired`.
            let was_pending = invite.status == InviteStatus::Pending;
            let expired = was_pending && resolve_if_expired(&invites, &mut invite, now_ms)?;
            (invite, expired)
        };
        if expired {
            tx.commit()?;
            return Err(InviteError::Expired(invite_id));
        }
        if invite.inviter_id != actor_id {
            return Err(InviteError::Forbidden(
                "only the inviter can cancel an invite",
            ));
        }
        ensure_pending(&invite)?;

        if !SqliteInviteRepository::new(&tx).resolve_pending(
            invite.id,
            InviteStatus::Cancelled,
            now_ms,
        )? {
            return Err(InviteError::AlreadyResolved {
                id: invite.id,
                status: invite.status,
            });
        }

        tx.commit()?;
        invite.status = InviteStatus::Cancelled;
        invite.resolved_at = Some(now_ms);
        Ok(invite)
    }

    /// Validates ids and normalizes the optional partner list name.
    fn normalize_target(
        &self,
        inviter_id: UserId,
        target: InviteTarget,
    ) -> InviteResult<InviteTarget> {
        if let Some(list_id) = target.list_id() {
            if list_id <= 0 {
                return Err(InviteError::Validation(format!("invalid list id {list_id}")));
            }
        }
        if let Some(user_id) = target.user_id() {
            if user_id <= 0 {
                return Err(InviteError::Validation(format!("invalid user id {user_id}")));
            }
            if user_id == inviter_id {
                return Err(InviteError::Forbidden("cannot invite yourself"));
            }
        }

        match target {
            InviteTarget::Partner { user_id, list_name } => {
                let list_name = list_name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty());
                if let Some(name) = &list_name {
                    let max = self.config.max_list_name_chars;
                    if name.chars().count() > max {
                        return Err(InviteError::Validation(format!(
                            "list name exceeds {max} characters"
                        )));
                    }
                }
                Ok(InviteTarget::Partner { user_id, list_name })
            }
            other => Ok(other),
        }
    }

    /// Store-backed checks for a new invite, run inside the create transaction.
    fn ensure_can_invite(
        &self,
        tx: &Connection,
        inviter_id: UserId,
        target: &InviteTarget,
    ) -> InviteResult<()> {
        let relationships = SqliteRelationshipRepository::new(tx);
        match target {
            InviteTarget::Friend {
                user_id: Some(user_id),
            } => {
                if relationships.find_friendship(inviter_id, *user_id)?.is_some() {
                    return Err(InviteError::AlreadyConnected);
                }
            }
            InviteTarget::Partner {
                user_id: Some(user_id),
                ..
            } => {
                if relationships
                    .find_partnership(inviter_id, *user_id)?
                    .is_some()
                {
                    return Err(InviteError::AlreadyConnected);
                }
            }
            InviteTarget::Friend { user_id: None } | InviteTarget::Partner { user_id: None, .. } => {
            }
            InviteTarget::ListDirect { list_id, .. } | InviteTarget::ListCode { list_id, .. } => {
                let lists = SqliteListRepository::new(tx);
                let list = lists
                    .get_list(*list_id)?
                    .ok_or(InviteError::ListNotFound(*list_id))?;
                let can_share = list.owner_id == inviter_id
                    || lists
                        .get_collaborator(*list_id, inviter_id)?
                        .is_some_and(|grant| grant.access == AccessLevel::CoOwner);
                if !can_share {
                    return Err(InviteError::Forbidden(
                        "only the list owner can share this list",
                    ));
                }
                if let InviteTarget::ListDirect { user_id, .. } = target {
                    RelationshipMaterializer::new(tx, &self.config.default_partner_list_name)
                        .ensure_not_on_list(*list_id, *user_id)?;
                }
            }
        }
        Ok(())
    }

    fn insert_with_fresh_code(
        &self,
        invites: &SqliteInviteRepository<'_>,
        inviter_id: UserId,
        target: &InviteTarget,
        created_at: i64,
        expires_at: Option<i64>,
    ) -> InviteResult<Invite> {
        let attempts = self.config.max_code_attempts;
        for attempt in 1..=attempts {
            let code = self.codes.generate();
            let insert = InviteInsert {
                inviter_id,
                target,
                code: &code,
                created_at,
                expires_at,
            };
            match invites.insert_invite(&insert) {
                Ok(invite) => return Ok(invite),
                Err(err) if err.is_unique_violation_on("invites.code") => {
                    warn!(
                        "event=invite_code_collision module=invite status=retry attempt={attempt} kind={}",
                        target.kind().as_str()
                    );
                }
                Err(err) if err.is_unique_violation_on("invites.target_key") => {
                    return Err(InviteError::DuplicatePending(None));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(InviteError::Store(RepoError::UniqueViolation(format!(
            "no unique invite code after {attempts} attempts"
        ))))
    }

    fn validate_ref(&self, invite_ref: &InviteRef) -> InviteResult<()> {
        match invite_ref {
            InviteRef::Id(id) if *id <= 0 => {
                Err(InviteError::Validation(format!("invalid invite id {id}")))
            }
            InviteRef::Id(_) => Ok(()),
            InviteRef::Code { code, .. } => self.validate_code(code),
        }
    }

    fn validate_code(&self, code: &str) -> InviteResult<()> {
        if self.codes.is_well_formed(code) {
            Ok(())
        } else {
            Err(InviteError::Validation("malformed invite code".to_string()))
        }
    }

    fn dispatch(&self, alert: NewAlert) {
        if let Some(sink) = &self.sink {
            dispatch_best_effort(sink, vec![alert]);
        }
    }
}

/// Loads an invite and applies recipient validation in order:
/// not found, expired, forbidden, already resolved.
fn load_for_recipient(
    invites: &SqliteInviteRepository<'_>,
    actor_id: UserId,
    invite_ref: &InviteRef,
    now_ms: i64,
) -> InviteResult<Loaded> {
    let invite = match invite_ref {
        InviteRef::Id(id) => invites.get_invite(*id)?,
        InviteRef::Code { kind, code } => invites.find_by_code(*kind, code)?,
    };
    let mut invite = invite.ok_or(InviteError::NotFound)?;

    if resolve_if_expired(invites, &mut invite, now_ms)? {
        return Ok(Loaded::Expired(invite.id));
    }
    if actor_id == invite.inviter_id {
        return Err(InviteError::Forbidden("cannot respond to your own invite"));
    }
    if !invite.is_recipient(actor_id) {
        return Err(InviteError::Forbidden("invite is addressed to another user"));
    }
    ensure_pending(&invite)?;
    Ok(Loaded::Ready(invite))
}

/// Rewrites an overdue pending invite to `expired`. Returns whether the
/// invite is (now) expired.
fn resolve_if_expired(
    invites: &SqliteInviteRepository<'_>,
    invite: &mut Invite,
    now_ms: i64,
) -> InviteResult<bool> {
    match invite.status {
        InviteStatus::Pending if invite.is_past_expiry(now_ms) => {
            invites.resolve_pending(invite.id, InviteStatus::Expired, now_ms)?;
            invite.status = InviteStatus::Expired;
            invite.resolved_at = Some(now_ms);
            Ok(true)
        }
        InviteStatus::Expired => Ok(true),
        _ => Ok(false),
    }
}

fn ensure_pending(invite: &Invite) -> InviteResult<()> {
    if invite.status.is_terminal() {
        return Err(InviteError::AlreadyResolved {
            id: invite.id,
            status: invite.status,
        });
    }
    Ok(())
}

fn log_outcome<T>(
    event: &'static str,
    started_at: Instant,
    result: &InviteResult<T>,
    describe: impl Fn(&T) -> (InviteId, InviteKind),
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => {
            let (invite_id, kind) = describe(value);
            info!(
                "event={event} module=invite status=ok invite_id={invite_id} kind={} duration_ms={duration_ms}",
                kind.as_str()
            );
        }
        Err(InviteError::Store(err)) => error!(
            "event={event} module=invite status=error error_code=store_error duration_ms={duration_ms} error={err}"
        ),
        Err(err) => info!(
            "event={event} module=invite status=rejected error_code={} duration_ms={duration_ms}",
            err.kind().map_or("unknown", |kind| kind.as_str())
        ),
    }
}

//! Invite domain model.
//!
//! # Responsibility
//! - Describe every invite kind as one tagged variant (`InviteTarget`).
//! - Own the pending/terminal state vocabulary used by the lifecycle engine.
//!
//! # Invariants
//! - `Pending` is the only non-terminal status.
//! - `target_key` is the identity used by the "one pending invite per
//!   (inviter, target, kind)" rule; two targets that should collide must
//!   produce the same key.
//! - An invite with `expires_at <= now` is expired regardless of the stored
//!   status string until it has been resolved.

use super::relationship::AccessLevel;
use super::{InviteId, ListId, UserId};
use serde::{Deserialize, Serialize};

/// Invite category. Determines validation and materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteKind {
    /// Friendship offer, targeted at one user or open to any code holder.
    Friend,
    /// Partnership offer that provisions a shared list on acceptance.
    Partner,
    /// Collaborator grant on a list for one named user.
    ListDirect,
    /// Collaborator grant on a list for whoever redeems the code.
    ListCode,
}

impl InviteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Friend => "friend",
            Self::Partner => "partner",
            Self::ListDirect => "list_direct",
            Self::ListCode => "list_code",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "friend" => Some(Self::Friend),
            "partner" => Some(Self::Partner),
            "list_direct" => Some(Self::ListDirect),
            "list_code" => Some(Self::ListCode),
            _ => None,
        }
    }
}

/// Invite lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    Expired,
}

impl InviteStatus {
    /// Returns whether no further transition is permitted.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Kind-specific payload of an invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InviteTarget {
    Friend {
        user_id: Option<UserId>,
    },
    Partner {
        user_id: Option<UserId>,
        /// Name for the shared list provisioned on acceptance.
        list_name: Option<String>,
    },
    ListDirect {
        list_id: ListId,
        user_id: UserId,
        access: AccessLevel,
    },
    ListCode {
        list_id: ListId,
        access: AccessLevel,
    },
}

impl InviteTarget {
    pub fn kind(&self) -> InviteKind {
        match self {
            Self::Friend { .. } => InviteKind::Friend,
            Self::Partner { .. } => InviteKind::Partner,
            Self::ListDirect { .. } => InviteKind::ListDirect,
            Self::ListCode { .. } => InviteKind::ListCode,
        }
    }

    /// Intended recipient, or `None` when any code holder may redeem.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Friend { user_id } | Self::Partner { user_id, .. } => *user_id,
            Self::ListDirect { user_id, .. } => Some(*user_id),
            Self::ListCode { .. } => None,
        }
    }

    pub fn list_id(&self) -> Option<ListId> {
        match self {
            Self::ListDirect { list_id, .. } | Self::ListCode { list_id, .. } => Some(*list_id),
            Self::Friend { .. } | Self::Partner { .. } => None,
        }
    }

    /// Key for the pending-uniqueness index.
    pub fn target_key(&self) -> String {
        match self {
            Self::Friend { user_id } | Self::Partner { user_id, .. } => match user_id {
                Some(user_id) => format!("user:{user_id}"),
                None => "open".to_string(),
            },
            Self::ListDirect {
                list_id, user_id, ..
            } => format!("list:{list_id}:user:{user_id}"),
            Self::ListCode { list_id, .. } => format!("list:{list_id}"),
        }
    }
}

/// Persisted invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invite {
    pub id: InviteId,
    pub inviter_id: UserId,
    #[serde(flatten)]
    pub target: InviteTarget,
    /// Single-use redemption code.
    pub code: String,
    pub status: InviteStatus,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    /// Set when the invite leaves `Pending`.
    pub resolved_at: Option<i64>,
}

impl Invite {
    pub fn kind(&self) -> InviteKind {
        self.target.kind()
    }

    /// Returns whether a pending invite has outlived its expiry at `now_ms`.
    pub fn is_past_expiry(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now_ms)
    }

    /// Returns whether `user_id` may accept or decline this invite.
    ///
    /// The inviter is never a valid recipient; open invites accept anyone else.
    pub fn is_recipient(&self, user_id: UserId) -> bool {
        if user_id == self.inviter_id {
            return false;
        }
        self.target
            .user_id()
            .map_or(true, |target| target == user_id)
    }
}

/// Create request accepted by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvite {
    pub target: InviteTarget,
    /// Overrides the configured time-to-live. `Some(None)` disables expiry.
    pub expires_at: Option<Option<i64>>,
}

impl NewInvite {
    pub fn new(target: InviteTarget) -> Self {
        Self {
            target,
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(Some(expires_at));
        self
    }

    pub fn never_expiring(mut self) -> Self {
        self.expires_at = Some(None);
        self
    }
}

/// Identifies an invite by row id or by redemption code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteRef {
    Id(InviteId),
    Code { kind: InviteKind, code: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(target: InviteTarget) -> Invite {
        Invite {
            id: 1,
            inviter_id: 10,
            target,
            code: "c".to_string(),
            status: InviteStatus::Pending,
            created_at: 0,
            expires_at: Some(100),
            resolved_at: None,
        }
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!InviteStatus::Pending.is_terminal());
        for status in [
            InviteStatus::Accepted,
            InviteStatus::Declined,
            InviteStatus::Cancelled,
            InviteStatus::Expired,
        ] {
            assert!(status.is_terminal(), "{status:?} should be terminal");
        }
    }

    #[test]
    fn target_key_separates_lists_for_same_user() {
        let first = InviteTarget::ListDirect {
            list_id: 1,
            user_id: 7,
            access: AccessLevel::Editor,
        };
        let second = InviteTarget::ListDirect {
            list_id: 2,
            user_id: 7,
            access: AccessLevel::Editor,
        };
        assert_ne!(first.target_key(), second.target_key());
        assert_eq!(
            InviteTarget::Friend { user_id: Some(7) }.target_key(),
            InviteTarget::Partner {
                user_id: Some(7),
                list_name: Some("ignored".to_string())
            }
            .target_key()
        );
    }

    #[test]
    fn inviter_is_never_recipient_of_open_invite() {
        let open = invite(InviteTarget::Friend { user_id: None });
        assert!(!open.is_recipient(10));
        assert!(open.is_recipient(11));

        let direct = invite(InviteTarget::Friend { user_id: Some(12) });
        assert!(!direct.is_recipient(11));
        assert!(direct.is_recipient(12));
    }

    #[test]
    fn expiry_is_inclusive_of_deadline() {
        let invite = invite(InviteTarget::Friend { user_id: None });
        assert!(!invite.is_past_expiry(99));
        assert!(invite.is_past_expiry(100));
    }

    #[test]
    fn kind_strings_roundtrip() {
        for kind in [
            InviteKind::Friend,
            InviteKind::Partner,
            InviteKind::ListDirect,
            InviteKind::ListCode,
        ] {
            assert_eq!(InviteKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(InviteKind::parse("group"), None);
    }
}

//! Per-user notification feed entries.

use super::{AlertId, InviteId, UserId};
use serde::Serialize;

/// Event that produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    InviteReceived,
    InviteAccepted,
    InviteDeclined,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InviteReceived => "invite_received",
            Self::InviteAccepted => "invite_accepted",
            Self::InviteDeclined => "invite_declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "invite_received" => Some(Self::InviteReceived),
            "invite_accepted" => Some(Self::InviteAccepted),
            "invite_declined" => Some(Self::InviteDeclined),
            _ => None,
        }
    }
}

/// Alert row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub id: AlertId,
    /// Recipient of the alert.
    pub user_id: UserId,
    pub kind: AlertKind,
    /// User whose action produced the alert, if still present.
    pub actor_id: Option<UserId>,
    pub invite_id: Option<InviteId>,
    pub is_read: bool,
    pub created_at: i64,
}

/// Alert to be inserted alongside an invite transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub user_id: UserId,
    pub kind: AlertKind,
    pub actor_id: Option<UserId>,
    pub invite_id: Option<InviteId>,
}

//! Durable relationships produced by accepted invites.

use super::{ListId, UserId};
use serde::{Deserialize, Serialize};

/// Access granted to a list collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Viewer,
    Editor,
    /// Full rights short of deleting the list; used for partner lists.
    CoOwner,
}

impl AccessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::CoOwner => "co_owner",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "viewer" => Some(Self::Viewer),
            "editor" => Some(Self::Editor),
            "co_owner" => Some(Self::CoOwner),
            _ => None,
        }
    }
}

/// Orders two user ids so an unordered pair has one storage key.
pub fn ordered_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Symmetric friendship edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Friendship {
    pub id: i64,
    pub user_low: UserId,
    pub user_high: UserId,
    pub created_at: i64,
}

impl Friendship {
    /// Returns the other side of the edge, or `None` if `user_id` is not a member.
    pub fn other(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.user_low {
            Some(self.user_high)
        } else if user_id == self.user_high {
            Some(self.user_low)
        } else {
            None
        }
    }
}

/// Partnership between two users plus the shared list provisioned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partnership {
    pub id: i64,
    pub user_low: UserId,
    pub user_high: UserId,
    /// `None` once the shared list has been deleted.
    pub list_id: Option<ListId>,
    pub created_at: i64,
}

/// Non-owner access grant on a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCollaborator {
    pub list_id: ListId,
    pub user_id: UserId,
    pub access: AccessLevel,
    pub granted_at: i64,
}

/// What an accepted invite materialized into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "relationship", rename_all = "snake_case")]
pub enum RelationshipResult {
    Friendship {
        friendship_id: i64,
        friend_id: UserId,
    },
    Partnership {
        partnership_id: i64,
        partner_id: UserId,
        list_id: ListId,
    },
    ListAccess {
        list_id: ListId,
        access: AccessLevel,
    },
}

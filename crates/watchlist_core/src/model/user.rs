//! User and list records.

use super::{ListId, UserId};
use serde::{Deserialize, Serialize};

/// Registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    /// Unique, compared case-insensitively.
    pub email: String,
    /// `None` for accounts that only sign in through an external provider.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub display_name: String,
    pub handle: Option<String>,
    pub created_at: i64,
}

impl User {
    /// Returns whether this account can only authenticate externally.
    pub fn authenticates_externally(&self) -> bool {
        self.password_hash.is_none()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            display_name: self.display_name.clone(),
            handle: self.handle.clone(),
        }
    }
}

/// Insert request for a new account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub display_name: String,
    pub handle: Option<String>,
}

/// Public projection returned by search and friend queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
}

/// Watchlist owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchList {
    pub id: ListId,
    pub owner_id: UserId,
    pub name: String,
    pub created_at: i64,
}

/// Category of list access a user currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListCategory {
    /// The user owns at least one list.
    Owned,
    /// The user shares a non-partner list with someone else, either as a
    /// collaborator or as the owner of a list that has collaborators.
    Collaborative,
    /// The user is part of a partnership with a provisioned shared list.
    Partner,
}

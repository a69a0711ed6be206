//! Invitation and collaborative-access core for the watchlist app.
//!
//! Invites of every kind (friend, partner, list) flow through one lifecycle
//! engine; accepted invites are materialized into friendships,
//! partnerships and list collaborator grants inside the same transaction.

pub mod clock;
pub mod code;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use code::{CodeGenerator, CodeSource};
pub use config::{ConfigError, CoreConfig, InviteConfig, SearchConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::alert::{Alert, AlertKind};
pub use model::invite::{Invite, InviteKind, InviteRef, InviteStatus, InviteTarget, NewInvite};
pub use model::relationship::{AccessLevel, RelationshipResult};
pub use model::user::{ListCategory, NewUser, User, UserSummary, WatchList};
pub use model::{AlertId, InviteId, ListId, UserId};
pub use repo::{RepoError, RepoResult};
pub use service::access_service::{AccessResolver, FriendsWhoShare};
pub use service::alert_sink::AlertSink;
pub use service::error::{into_outcome, ErrorKind, InviteError, InviteResult, Outcome, StoreError};
pub use service::invite_service::{Acceptance, InviteService};
pub use service::notification_service::NotificationService;
pub use service::relationship_service::RelationshipService;
pub use service::user_service::UserService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

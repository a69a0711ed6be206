//! Domain model for users, lists, invites and the relationships they create.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and services.
//! - Keep invite kinds as one tagged variant so a single lifecycle engine
//!   can drive every kind.
//!
//! # Invariants
//! - All identifiers are store-assigned integers.
//! - All timestamps are Unix epoch milliseconds.

pub mod alert;
pub mod invite;
pub mod relationship;
pub mod user;

/// Store-assigned user identifier supplied by the external identity layer.
pub type UserId = i64;
/// Store-assigned list identifier.
pub type ListId = i64;
/// Store-assigned invite identifier.
pub type InviteId = i64;
/// Store-assigned alert identifier.
pub type AlertId = i64;

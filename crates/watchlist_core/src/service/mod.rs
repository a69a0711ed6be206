//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Own transaction boundaries: each mutating operation is one
//!   `BEGIN IMMEDIATE` transaction on the caller's connection.
//! - Translate repository failures into `InviteError`.

pub mod access_service;
pub mod alert_sink;
pub mod error;
pub mod invite_service;
pub(crate) mod materializer;
pub mod notification_service;
pub mod relationship_service;
pub mod user_service;

use crate::repo::RepoResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Starts a write transaction that takes the database write lock up front.
pub(crate) fn begin_immediate(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

//! Lifecycle error taxonomy and the client-facing outcome envelope.
//!
//! # Invariants
//! - Every expected failure maps to exactly one `ErrorKind`.
//! - `InviteError::Store` has no `ErrorKind`; it is never folded into an
//!   `Outcome` and always propagates as a request failure.

use crate::model::invite::InviteStatus;
use crate::model::{InviteId, ListId};
use crate::repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type InviteResult<T> = Result<T, InviteError>;

/// Infrastructure failure surfaced as a generic request failure.
pub type StoreError = RepoError;

/// Client-facing classification of expected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Expired,
    AlreadyResolved,
    AlreadyConnected,
    DuplicatePending,
    ListNotFound,
    ValidationError,
}

impl ErrorKind {
    /// Stable code used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Expired => "expired",
            Self::AlreadyResolved => "already_resolved",
            Self::AlreadyConnected => "already_connected",
            Self::DuplicatePending => "duplicate_pending",
            Self::ListNotFound => "list_not_found",
            Self::ValidationError => "validation_error",
        }
    }
}

/// Error for invite lifecycle and relationship operations.
#[derive(Debug)]
pub enum InviteError {
    /// Invite (or a user it names) does not exist.
    NotFound,
    /// Actor is not allowed to perform this transition.
    Forbidden(&'static str),
    Expired(InviteId),
    AlreadyResolved {
        id: InviteId,
        status: InviteStatus,
    },
    /// The relationship the invite would create already exists.
    AlreadyConnected,
    /// A pending invite for the same (inviter, target, kind) exists.
    DuplicatePending(Option<InviteId>),
    ListNotFound(ListId),
    Validation(String),
    Store(StoreError),
}

impl InviteError {
    /// Returns the client-facing kind, or `None` for store failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::NotFound => Some(ErrorKind::NotFound),
            Self::Forbidden(_) => Some(ErrorKind::Forbidden),
            Self::Expired(_) => Some(ErrorKind::Expired),
            Self::AlreadyResolved { .. } => Some(ErrorKind::AlreadyResolved),
            Self::AlreadyConnected => Some(ErrorKind::AlreadyConnected),
            Self::DuplicatePending(_) => Some(ErrorKind::DuplicatePending),
            Self::ListNotFound(_) => Some(ErrorKind::ListNotFound),
            Self::Validation(_) => Some(ErrorKind::ValidationError),
            Self::Store(_) => None,
        }
    }
}

impl Display for InviteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "invite not found"),
            Self::Forbidden(reason) => write!(f, "forbidden: {reason}"),
            Self::Expired(id) => write!(f, "invite {id} has expired"),
            Self::AlreadyResolved { id, status } => {
                write!(f, "invite {id} is already {}", status.as_str())
            }
            Self::AlreadyConnected => write!(f, "users are already connected"),
            Self::DuplicatePending(Some(id)) => {
                write!(f, "a pending invite already exists: {id}")
            }
            Self::DuplicatePending(None) => write!(f, "a pending invite already exists"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::Validation(message) => write!(f, "invalid request: {message}"),
            Self::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for InviteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for InviteError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for InviteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value.into())
    }
}

/// `{success, error?, message?, ...result}` envelope returned to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub result: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            result: Some(result),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(kind),
            message: Some(message.into()),
            result: None,
        }
    }
}

/// Folds expected failures into an `Outcome`; store failures stay `Err`.
pub fn into_outcome<T>(result: InviteResult<T>) -> Result<Outcome<T>, StoreError> {
    match result {
        Ok(value) => Ok(Outcome::ok(value)),
        Err(InviteError::Store(err)) => Err(err),
        Err(err) => {
            let kind = err.kind().unwrap_or(ErrorKind::ValidationError);
            Ok(Outcome::failed(kind, err.to_string()))
        }
    }
}

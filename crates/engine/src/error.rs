//! The module contains the errors the ledger engine can return.
//!
//! Store failures are wrapped as [`Store`] so callers can treat them as
//! transient and retryable; everything else is a business-rule violation
//! surfaced verbatim.
//!
//! [`Store`]: LedgerError::Store
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger engine errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("already resolved: {0}")]
    AlreadyResolved(String),
    #[error("already completed: {0}")]
    AlreadyCompleted(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error(transparent)]
    Store(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::AuthenticationRequired, Self::AuthenticationRequired) => true,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::AlreadyResolved(a), Self::AlreadyResolved(b)) => a == b,
            (Self::AlreadyCompleted(a), Self::AlreadyCompleted(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::Store(a), Self::Store(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

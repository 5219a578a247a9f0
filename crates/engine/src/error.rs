//! The module contains the error the engine can throw.
//!
//! Validation errors ([`InvalidAmount`], [`SameParty`], [`InvalidRole`],
//! [`InvalidEmail`]) are recoverable by correcting the input. [`Forbidden`] and [`NotAMember`] are
//! authorization failures and are never retried. [`InvalidToken`] carries no
//! detail on purpose: it covers wrong token, wrong email, already accepted
//! and expired alike, so an enumerating caller learns nothing from the
//! failure mode. [`Database`] is transient and safe to retry with backoff.
//!
//! [`InvalidAmount`]: EngineError::InvalidAmount
//! [`SameParty`]: EngineError::SameParty
//! [`InvalidRole`]: EngineError::InvalidRole
//! [`InvalidEmail`]: EngineError::InvalidEmail
//! [`Forbidden`]: EngineError::Forbidden
//! [`NotAMember`]: EngineError::NotAMember
//! [`InvalidToken`]: EngineError::InvalidToken
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Same party: {0}")]
    SameParty(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not a group member: {0}")]
    NotAMember(String),
    #[error("invalid or expired invitation")]
    InvalidToken,
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::SameParty(a), Self::SameParty(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidEmail(a), Self::InvalidEmail(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::NotAMember(a), Self::NotAMember(b)) => a == b,
            (Self::InvalidToken, Self::InvalidToken) => true,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

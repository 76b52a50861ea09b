//! Domain failures.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("email unavailable")]
    EmailUnavailable,
    #[error("public name unavailable")]
    PublicNameUnavailable,
    #[error("user store is full")]
    StoreFull,
    #[error("user store is closed")]
    StoreClosed,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

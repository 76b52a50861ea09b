//! Application error taxonomy.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::DomainError;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    Internal,
    Unauthenticated,
    Forbidden,
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT_ERROR",
            ErrorKind::NotFound => "NOT_FOUND_ERROR",
            ErrorKind::Conflict => "CONFLICT_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED_ERROR",
            ErrorKind::Forbidden => "FORBIDDEN_ERROR",
            ErrorKind::Canceled => "CANCELED_ERROR",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED_ERROR",
        };
        f.write_str(name)
    }
}

/// Error returned by use cases.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    /// Per-field details, e.g. validation failures keyed by field name.
    pub metadata: BTreeMap<String, String>,
    #[source]
    pub cause: Option<Cause>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            metadata: BTreeMap::new(),
            cause: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>, metadata: BTreeMap<String, String>) -> Self {
        Self {
            metadata,
            ..Self::new(ErrorKind::InvalidArgument, message)
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UserNotFound => AppError::not_found("User not found."),
            DomainError::UserAlreadyExists => AppError::conflict("User already exists.").with_cause(err),
            DomainError::EmailUnavailable => AppError::conflict("User already exists.")
                .with_metadata("email", err.to_string())
                .with_cause(err),
            DomainError::PublicNameUnavailable => AppError::conflict("User already exists.")
                .with_metadata("public_name", err.to_string())
                .with_cause(err),
            DomainError::StoreFull | DomainError::StoreClosed | DomainError::Hashing(_) => {
                AppError::internal("Unexpected server error.").with_cause(err)
            }
        }
    }
}

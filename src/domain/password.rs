//! Password value objects and the hashing contract.

use std::fmt;

use crate::domain::DomainError;

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 64;

/// Hashes and verifies passwords.
pub trait Hasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, DomainError>;
    fn verify(&self, hash: &str, plain: &str) -> Result<bool, DomainError>;
}

/// A password that passed the strength rules. Never logged.
#[derive(Clone)]
pub struct PlainPassword(String);

impl PlainPassword {
    pub fn parse(value: &str) -> Result<Self, String> {
        let len = value.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(format!("password length must be between {} and {}", MIN_LEN, MAX_LEN));
        }

        let has_lower = value.chars().any(char::is_lowercase);
        let has_upper = value.chars().any(char::is_uppercase);
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        let has_special = value
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

        if !has_lower {
            return Err("password must contain at least one lowercase letter".into());
        }
        if !has_upper {
            return Err("password must contain at least one uppercase letter".into());
        }
        if !has_digit {
            return Err("password must contain at least one digit".into());
        }
        if !has_special {
            return Err("password must contain at least one special character".into());
        }
        Ok(Self(value.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn hash(&self, hasher: &dyn Hasher) -> Result<HashedPassword, DomainError> {
        hasher.hash(&self.0).map(HashedPassword)
    }
}

impl fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlainPassword(***)")
    }
}

/// A stored password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, plain: &str, hasher: &dyn Hasher) -> Result<bool, DomainError> {
        hasher.verify(&self.0, plain)
    }
}

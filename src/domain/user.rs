//! User entity and repository contract.

use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{DomainError, Email, HashedPassword, PublicName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Banned,
    Deleted,
}

/// Validated registration data, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password: HashedPassword,
    pub public_name: PublicName,
    pub country_code: Option<String>,
    pub language: String,
}

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub password: HashedPassword,
    pub public_name: PublicName,
    pub country_code: Option<String>,
    pub language: String,
    pub status: UserStatus,
    pub is_verified: bool,
    pub is_premium: bool,
    pub created_at: SystemTime,
    pub last_active_at: SystemTime,
}

impl User {
    /// Initial state of a freshly registered account.
    pub fn register(id: UserId, new: NewUser) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            email: new.email,
            password: new.password,
            public_name: new.public_name,
            country_code: new.country_code,
            language: new.language,
            status: UserStatus::Active,
            is_verified: false,
            is_premium: false,
            created_at: now,
            last_active_at: now,
        }
    }
}

/// Persistence contract for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new user. Email and public name must be unused.
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    async fn get_by_email(&self, email: &str) -> Result<User, DomainError>;

    async fn is_email_available(&self, email: &str) -> Result<bool, DomainError>;

    async fn is_public_name_available(&self, name: &str) -> Result<bool, DomainError>;
}

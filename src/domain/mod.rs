//! User domain.
//!
//! # Contents
//! - Value objects validated at construction (`email`, `password`, `public_name`)
//! - `User` entity and the `UserRepository` contract
//! - `DomainError`, the failures a repository or value object can report

pub mod email;
pub mod error;
pub mod password;
pub mod public_name;
pub mod user;

pub use email::Email;
pub use error::DomainError;
pub use password::{HashedPassword, Hasher, PlainPassword};
pub use public_name::PublicName;
pub use user::{NewUser, User, UserId, UserRepository, UserStatus};

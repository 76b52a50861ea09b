//! Argon2 password hashing.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::domain::{DomainError, Hasher};

/// [`Hasher`] backed by Argon2id with default parameters.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher;

impl Hasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::Hashing(e.to_string()))
    }

    fn verify(&self, hash: &str, plain: &str) -> Result<bool, DomainError> {
        let parsed = PasswordHash::new(hash).map_err(|e| DomainError::Hashing(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}

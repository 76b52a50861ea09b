//! Register a new user.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::AppError;
use crate::domain::{Email, Hasher, NewUser, PlainPassword, PublicName, UserRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserInput {
    pub email: String,
    pub public_name: String,
    pub password: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUserOutput {
    pub message: String,
}

/// Validates registration input, hashes the password and stores the user.
#[derive(Clone)]
pub struct RegisterUser {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn Hasher>,
}

impl RegisterUser {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn Hasher>) -> Self {
        Self { users, hasher }
    }

    pub async fn execute(&self, input: RegisterUserInput) -> Result<RegisterUserOutput, AppError> {
        let mut errors = BTreeMap::new();

        let email = Email::parse(&input.email)
            .map_err(|e| errors.insert("email".to_string(), e))
            .ok();
        let password = PlainPassword::parse(&input.password)
            .map_err(|e| errors.insert("password".to_string(), e))
            .ok();
        let public_name = PublicName::parse(&input.public_name)
            .map_err(|e| errors.insert("public_name".to_string(), e))
            .ok();
        if input.language.trim().is_empty() {
            errors.insert("language".to_string(), "language required".to_string());
        }

        let (Some(email), Some(password), Some(public_name)) = (email, password, public_name) else {
            return Err(AppError::invalid_argument("validation failed", errors));
        };
        if !errors.is_empty() {
            return Err(AppError::invalid_argument("validation failed", errors));
        }

        let mut conflicts = BTreeMap::new();
        if !self.users.is_email_available(email.as_str()).await? {
            conflicts.insert("email".to_string(), "email unavailable".to_string());
        }
        if !self.users.is_public_name_available(public_name.as_str()).await? {
            conflicts.insert("public_name".to_string(), "public name unavailable".to_string());
        }
        if !conflicts.is_empty() {
            let mut err = AppError::conflict("User already exists.");
            err.metadata = conflicts;
            return Err(err);
        }

        // Argon2 is CPU-bound; keep it off the async workers.
        let hasher = Arc::clone(&self.hasher);
        let hashed = tokio::task::spawn_blocking(move || password.hash(hasher.as_ref()))
            .await
            .map_err(|e| AppError::internal("Unexpected server error.").with_cause(e))??;

        let user = self
            .users
            .create(NewUser {
                email,
                password: hashed,
                public_name,
                country_code: input.country_code.filter(|c| !c.is_empty()),
                language: input.language,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(RegisterUserOutput {
            message: "User successfully registered.".to_string(),
        })
    }
}

//! In-process user store.
//!
//! # Responsibilities
//! - Implement `UserRepository` over concurrent maps
//! - Enforce unique email and public name
//! - Act as a shutdown resource: once closed, every call fails with
//!   `DomainError::StoreClosed`

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::domain::{DomainError, NewUser, User, UserId, UserRepository};
use crate::lifecycle::resource::{ResourceError, Shutdownable};

#[derive(Debug)]
pub struct MemoryUserStore {
    users: DashMap<UserId, User>,
    /// email -> id
    emails: DashMap<String, UserId>,
    /// public name -> id
    public_names: DashMap<String, UserId>,
    next_id: AtomicU64,
    /// Slots taken by stored users and creates in progress.
    reserved: AtomicUsize,
    closed: AtomicBool,
    max_users: usize,
}

impl MemoryUserStore {
    pub fn new(max_users: usize) -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            public_names: DashMap::new(),
            next_id: AtomicU64::new(1),
            reserved: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            max_users,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Claim a capacity slot; the check and the claim are one atomic step.
    fn reserve_slot(&self) -> Result<(), DomainError> {
        self.reserved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |taken| {
                (taken < self.max_users).then_some(taken + 1)
            })
            .map(|_| ())
            .map_err(|_| DomainError::StoreFull)
    }

    fn insert_unique(&self, user: NewUser) -> Result<User, DomainError> {
        let id = UserId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // Reserve both unique keys; release the first if the second is taken.
        match self.emails.entry(user.email.as_str().to_string()) {
            Entry::Occupied(_) => return Err(DomainError::EmailUnavailable),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        match self.public_names.entry(user.public_name.as_str().to_string()) {
            Entry::Occupied(_) => {
                self.emails.remove(user.email.as_str());
                return Err(DomainError::PublicNameUnavailable);
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let user = User::register(id, user);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::StoreClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        self.ensure_open()?;
        self.reserve_slot()?;

        match self.insert_unique(user) {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "User stored");
                Ok(user)
            }
            Err(e) => {
                self.reserved.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<User, DomainError> {
        self.ensure_open()?;
        let id = self
            .emails
            .get(email)
            .map(|entry| *entry.value())
            .ok_or(DomainError::UserNotFound)?;
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(DomainError::UserNotFound)
    }

    async fn is_email_available(&self, email: &str) -> Result<bool, DomainError> {
        self.ensure_open()?;
        Ok(!self.emails.contains_key(email))
    }

    async fn is_public_name_available(&self, name: &str) -> Result<bool, DomainError> {
        self.ensure_open()?;
        Ok(!self.public_names.contains_key(name))
    }
}

#[async_trait]
impl Shutdownable for MemoryUserStore {
    fn name(&self) -> &str {
        "user-store"
    }

    async fn shutdown(&self, _deadline: Instant) -> Result<(), ResourceError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ResourceError::Failed("user store already closed".into()));
        }
        tracing::info!(users = self.users.len(), "User store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Email, HashedPassword, PublicName};
    use std::time::Duration;

    fn new_user(email: &str, name: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            password: HashedPassword::from_hash("hash"),
            public_name: PublicName::parse(name).unwrap(),
            country_code: None,
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn enforces_unique_keys() {
        let store = MemoryUserStore::new(10);
        let first = store.create(new_user("a@example.com", "alpha")).await.unwrap();
        assert_eq!(first.id, UserId(1));

        assert_eq!(
            store.create(new_user("a@example.com", "beta")).await.unwrap_err(),
            DomainError::EmailUnavailable
        );
        assert_eq!(
            store.create(new_user("b@example.com", "alpha")).await.unwrap_err(),
            DomainError::PublicNameUnavailable
        );
        // The failed attempt must not keep b@example.com reserved.
        assert!(store.is_email_available("b@example.com").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn capacity_limit() {
        let store = MemoryUserStore::new(1);
        store.create(new_user("a@example.com", "alpha")).await.unwrap();
        assert_eq!(
            store.create(new_user("b@example.com", "beta")).await.unwrap_err(),
            DomainError::StoreFull
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_respect_capacity() {
        let store = std::sync::Arc::new(MemoryUserStore::new(5));
        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .create(new_user(&format!("user{}@example.com", i), &format!("user{}", i)))
                    .await
            }));
        }

        let mut stored = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => stored += 1,
                Err(e) => assert_eq!(e, DomainError::StoreFull),
            }
        }
        assert_eq!(stored, 5);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn rejected_duplicate_frees_its_slot() {
        let store = MemoryUserStore::new(2);
        store.create(new_user("a@example.com", "alpha")).await.unwrap();
        assert!(store.create(new_user("a@example.com", "beta")).await.is_err());
        store.create(new_user("b@example.com", "beta")).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn closed_store_rejects_calls() {
        let store = MemoryUserStore::new(10);
        let deadline = Instant::now() + Duration::from_secs(1);
        store.shutdown(deadline).await.unwrap();
        assert!(store.is_closed());
        assert_eq!(
            store.create(new_user("a@example.com", "alpha")).await.unwrap_err(),
            DomainError::StoreClosed
        );
        assert!(store.shutdown(deadline).await.is_err());
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer for users and provider links.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AuthError;
use crate::models::{Provider, ProviderLink, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index (keyed by normalized email)
    pub const USER_EMAILS: &str = "user_emails";
    /// Provider links (keyed by `{provider}_{uid}`)
    pub const PROVIDERS: &str = "providers";
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint (email, or provider + uid) rejected the write.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AuthError::PersistenceConflict,
            StoreError::Backend(msg) => AuthError::Store(msg),
        }
    }
}

/// User and provider-link persistence.
///
/// Implementations must enforce uniqueness of user emails and of
/// `(provider, uid)` pairs, reporting violations as [`StoreError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Look up a user by email; the email is normalized before lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_link(
        &self,
        provider: Provider,
        uid: &str,
    ) -> Result<Option<ProviderLink>, StoreError>;

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<ProviderLink>, StoreError>;

    /// Create a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Set `last_login` on an existing user, leaving every other field as stored.
    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Save `user` and create `link` atomically: both are written or neither.
    ///
    /// With `user_is_new` the user's email must not be taken yet.
    async fn commit_link(
        &self,
        user: &User,
        user_is_new: bool,
        link: &ProviderLink,
    ) -> Result<(), StoreError>;
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session flows: password sign-in, registration, provider sign-in and
//! request authentication.
//!
//! Sessions are stateless bearer tokens, so sign-out has no server side.

use crate::db::{StoreError, UserStore};
use crate::error::AuthError;
use crate::models::{normalize_email, NewUser, Provider, User};
use crate::services::linking::IdentityLinker;
use crate::services::password::{PasswordHasher, PasswordPolicy};
use crate::services::token::TokenCodec;
use chrono::Utc;
use std::sync::Arc;

/// A signed-in user and their freshly issued token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequestContext {
    pub user: User,
    pub token: String,
}

pub struct SessionService {
    store: Arc<dyn UserStore>,
    tokens: TokenCodec,
    linker: IdentityLinker,
    hasher: Arc<dyn PasswordHasher>,
    policy: Arc<dyn PasswordPolicy>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: TokenCodec,
        linker: IdentityLinker,
        hasher: Arc<dyn PasswordHasher>,
        policy: Arc<dyn PasswordPolicy>,
    ) -> Self {
        Self {
            store,
            tokens,
            linker,
            hasher,
            policy,
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Sign in with email and password.
    ///
    /// Unknown email, provider-only account and wrong password all yield
    /// the same `InvalidCredentials`, after the same amount of hashing work.
    pub async fn sign_in_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.store.find_user_by_email(email).await?;

        let stored_hash = user.as_ref().and_then(|user| user.password_hash.clone());
        let has_hash = stored_hash.is_some();
        let encoded = stored_hash.unwrap_or_else(|| self.hasher.dummy_hash().to_string());
        let verified = self.verify_password(password, encoded).await? && has_hash;

        match user {
            Some(user) if verified => {
                tracing::info!(user_id = %user.id, "Password sign-in");
                self.start_session(user).await
            }
            _ => {
                tracing::warn!("Password sign-in rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Register a new password account.
    pub async fn register(&self, new_user: NewUser, password: &str) -> Result<Session, AuthError> {
        if normalize_email(&new_user.email).is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }

        let mut user = User::from_registration(new_user);
        self.policy.validate(password, &user)?;
        user.password_hash = Some(self.hash_password(password).await?);
        user.last_login = Some(Utc::now());

        self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::EmailAlreadyInUse,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "User registered");

        let token = self.tokens.issue(&user, Utc::now())?;
        Ok(Session { user, token })
    }

    /// Sign in with, or link, a provider account.
    pub async fn sign_in_provider(
        &self,
        provider: Provider,
        uid: &str,
        access_token: &str,
        current_user: Option<&User>,
    ) -> Result<Session, AuthError> {
        let user = self
            .linker
            .resolve_and_link(provider, uid, access_token, current_user)
            .await?;

        self.start_session(user).await
    }

    /// Stateless: nothing to revoke. The HTTP layer clears the cookie.
    pub fn sign_out(&self, token: Option<&str>) {
        if let Some(user_id) = token.and_then(|t| self.tokens.verify(t, Utc::now()).ok()) {
            tracing::info!(user_id = %user_id, "Signed out");
        }
    }

    /// Verify a bearer token and load its user.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedRequestContext, AuthError> {
        let user_id = self.tokens.verify(token, Utc::now())?;

        let user = self
            .store
            .find_user_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthenticatedRequestContext {
            user,
            token: token.to_string(),
        })
    }

    // Key derivation is CPU-bound, so it runs off the async workers.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Store(format!("password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, encoded: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &encoded))
            .await
            .map_err(|e| AuthError::Store(format!("password check task failed: {}", e)))
    }

    async fn start_session(&self, mut user: User) -> Result<Session, AuthError> {
        let now = Utc::now();
        self.store.record_login(&user.id, now).await?;
        user.last_login = Some(now);

        let token = self.tokens.issue(&user, now)?;
        Ok(Session { user, token })
    }
}

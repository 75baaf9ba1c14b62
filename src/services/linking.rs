// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity linking: resolve a provider identity to exactly one local user.
//!
//! The resolution order is:
//! 1. Verify the access token with the provider (before touching local state)
//! 2. Reject takeovers: the link or the email belongs to a different user
//! 3. An existing link resolves to its owner unchanged
//! 4. Otherwise link to the current user, the user owning the email, or a new user,
//!    filling empty profile fields, and commit user + link atomically

use crate::db::UserStore;
use crate::error::AuthError;
use crate::models::{NormalizedProfile, Provider, ProviderLink, User};
use crate::services::normalizer;
use crate::services::providers::ProfileFetcher;
use std::sync::Arc;
use std::time::Duration;

/// Resolves provider identities to local users.
#[derive(Clone)]
pub struct IdentityLinker {
    store: Arc<dyn UserStore>,
    fetcher: Arc<dyn ProfileFetcher>,
    fetch_timeout: Duration,
}

impl IdentityLinker {
    pub fn new(
        store: Arc<dyn UserStore>,
        fetcher: Arc<dyn ProfileFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            fetch_timeout,
        }
    }

    /// Resolve `(provider, uid)` to a local user, linking it if needed.
    ///
    /// `current_user` is the already-authenticated caller when linking a
    /// provider to an existing account; `None` for sign-in-or-register.
    pub async fn resolve_and_link(
        &self,
        provider: Provider,
        uid: &str,
        access_token: &str,
        current_user: Option<&User>,
    ) -> Result<User, AuthError> {
        let profile = self.fetch_verified(provider, uid, access_token).await?;

        match self.link_profile(provider, uid, &profile, current_user).await {
            Err(AuthError::PersistenceConflict) => {
                // Lost a uniqueness race; the winner's link is visible now
                tracing::warn!(
                    provider = %provider,
                    "Provider link write conflicted, re-resolving once"
                );
                self.link_profile(provider, uid, &profile, current_user).await
            }
            result => result,
        }
    }

    /// Fetch and normalize the provider profile, checking the reported uid.
    async fn fetch_verified(
        &self,
        provider: Provider,
        uid: &str,
        access_token: &str,
    ) -> Result<NormalizedProfile, AuthError> {
        let external =
            tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(provider, access_token))
                .await
                .map_err(|_| {
                    tracing::warn!(provider = %provider, "Provider profile fetch timed out");
                    AuthError::ProviderVerificationFailed(format!("{} did not respond", provider))
                })??;

        if external.uid != uid {
            tracing::warn!(provider = %provider, "Provider uid mismatch");
            return Err(AuthError::ProviderVerificationFailed(format!(
                "{} user id doesn't match",
                provider
            )));
        }

        normalizer::normalize(provider, &external.raw)
    }

    async fn link_profile(
        &self,
        provider: Provider,
        uid: &str,
        profile: &NormalizedProfile,
        current_user: Option<&User>,
    ) -> Result<User, AuthError> {
        let existing_link = self.store.find_link(provider, uid).await?;
        let email_user = self.store.find_user_by_email(&profile.email).await?;

        if let Some(current) = current_user {
            if existing_link
                .as_ref()
                .is_some_and(|link| link.user_id != current.id)
            {
                tracing::warn!(
                    provider = %provider,
                    user_id = %current.id,
                    "Rejected link: provider account owned by another user"
                );
                return Err(AuthError::ProviderAlreadyLinked);
            }
            if email_user.as_ref().is_some_and(|user| user.id != current.id) {
                tracing::warn!(
                    provider = %provider,
                    user_id = %current.id,
                    "Rejected link: profile email owned by another user"
                );
                return Err(AuthError::EmailAlreadyInUse);
            }
        }

        if let Some(link) = existing_link {
            return self
                .store
                .find_user_by_id(&link.user_id)
                .await?
                .ok_or_else(|| {
                    AuthError::Store(format!("linked user {} not found", link.user_id))
                });
        }

        let (mut user, user_is_new) = match (current_user, email_user) {
            // The caller's snapshot dates from authentication; merge into the stored record
            (Some(current), _) => {
                let stored = self.store.find_user_by_id(&current.id).await?;
                (stored.unwrap_or_else(|| current.clone()), false)
            }
            (None, Some(existing)) => (existing, false),
            (None, None) => (User::new(&profile.email), true),
        };
        user.merge_profile(profile);

        let link = ProviderLink::new(provider, uid, &user.id);
        self.store.commit_link(&user, user_is_new, &link).await?;

        tracing::info!(
            provider = %provider,
            user_id = %user.id,
            user_is_new,
            "Provider account linked"
        );

        Ok(user)
    }
}

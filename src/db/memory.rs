// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process user store, used for local development and tests.

use super::{StoreError, UserStore};
use crate::models::{normalize_email, Provider, ProviderLink, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    /// normalized email -> user id
    emails: HashMap<String, String>,
    /// link key -> link
    links: HashMap<String, ProviderLink>,
}

/// Store backed by in-memory maps behind a single lock.
///
/// All multi-record writes happen under one write guard, so they are atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored provider links.
    pub async fn link_count(&self) -> usize {
        self.tables.read().await.links.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(&normalize_email(email))
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_link(
        &self,
        provider: Provider,
        uid: &str,
    ) -> Result<Option<ProviderLink>, StoreError> {
        let key = ProviderLink::key(provider, uid);
        Ok(self.tables.read().await.links.get(&key).cloned())
    }

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<ProviderLink>, StoreError> {
        let tables = self.tables.read().await;
        let mut links: Vec<ProviderLink> = tables
            .links
            .values()
            .filter(|link| link.user_id == user_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(links)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let email = normalize_email(&user.email);
        if tables.emails.contains_key(&email) {
            return Err(StoreError::Conflict(format!("email {}", email)));
        }
        tables.emails.insert(email, user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::Backend(format!("user {} not found", user_id)))?;
        user.last_login = Some(at);
        Ok(())
    }

    async fn commit_link(
        &self,
        user: &User,
        user_is_new: bool,
        link: &ProviderLink,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let key = link.document_id();
        if tables.links.contains_key(&key) {
            return Err(StoreError::Conflict(format!("provider link {}", key)));
        }

        let email = normalize_email(&user.email);
        if user_is_new {
            if tables.emails.contains_key(&email) {
                return Err(StoreError::Conflict(format!("email {}", email)));
            }
        } else if !tables.users.contains_key(&user.id) {
            return Err(StoreError::Backend(format!("user {} not found", user.id)));
        }

        tables.emails.insert(email, user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        tables.links.insert(key, link.clone());
        Ok(())
    }
}

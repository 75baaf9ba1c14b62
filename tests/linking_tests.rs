// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity linking tests over the in-memory store.

use async_trait::async_trait;
use authlink::db::{MemoryStore, StoreError, UserStore};
use authlink::error::AuthError;
use authlink::models::{Provider, ProviderLink, User};
use authlink::services::IdentityLinker;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{facebook_payload, google_payload, StubFetcher};

const TIMEOUT: Duration = Duration::from_secs(5);

fn linker(store: &MemoryStore, fetcher: Arc<StubFetcher>) -> IdentityLinker {
    IdentityLinker::new(Arc::new(store.clone()), fetcher, TIMEOUT)
}

async fn insert_user(store: &MemoryStore, email: &str) -> User {
    let user = User::new(email);
    store.insert_user(&user).await.unwrap();
    user
}

#[tokio::test]
async fn test_new_identity_creates_user_and_link() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "g1", google_payload("New@Example.com", "Ada", "Lovelace"));

    let user = linker(&store, fetcher)
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await
        .unwrap();

    assert_eq!(user.email, "new@example.com");
    assert_eq!(user.first_name, "Ada");
    assert_eq!(user.last_name, "Lovelace");
    assert_eq!(
        store.find_link(Provider::Google, "g1").await.unwrap().unwrap().user_id,
        user.id
    );
    assert_eq!(
        store.find_user_by_email("new@example.com").await.unwrap(),
        Some(user)
    );
}

#[tokio::test]
async fn test_linking_is_idempotent() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "g1", google_payload("a@b.com", "A", "B"));
    let linker = linker(&store, fetcher);

    let first = linker
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await
        .unwrap();
    let second = linker
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.link_count().await, 1);
}

#[tokio::test]
async fn test_link_owned_by_other_user_is_rejected_without_mutation() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "X", google_payload("a@b.com", "A", "B"));
    let linker = linker(&store, fetcher);

    let owner = linker
        .resolve_and_link(Provider::Google, "X", "tok", None)
        .await
        .unwrap();
    let other = insert_user(&store, "other@b.com").await;

    let result = linker
        .resolve_and_link(Provider::Google, "X", "tok", Some(&other))
        .await;

    assert!(matches!(result, Err(AuthError::ProviderAlreadyLinked)));
    assert_eq!(store.link_count().await, 1);
    assert_eq!(
        store.find_link(Provider::Google, "X").await.unwrap().unwrap().user_id,
        owner.id
    );
    assert_eq!(
        store.find_user_by_id(&other.id).await.unwrap(),
        Some(other)
    );
}

#[tokio::test]
async fn test_email_owned_by_other_user_is_rejected() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "fb1", facebook_payload("taken@b.com", "T", "U"));
    insert_user(&store, "taken@b.com").await;
    let current = insert_user(&store, "me@b.com").await;

    let result = linker(&store, fetcher)
        .resolve_and_link(Provider::Facebook, "fb1", "tok", Some(&current))
        .await;

    assert!(matches!(result, Err(AuthError::EmailAlreadyInUse)));
    assert_eq!(store.link_count().await, 0);
}

#[tokio::test]
async fn test_sign_in_with_known_email_links_existing_user() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "fb1", facebook_payload("known@b.com", "K", "N"));
    let existing = insert_user(&store, "known@b.com").await;

    let user = linker(&store, fetcher)
        .resolve_and_link(Provider::Facebook, "fb1", "tok", None)
        .await
        .unwrap();

    assert_eq!(user.id, existing.id);
    assert_eq!(user.first_name, "K");
    assert_eq!(store.links_for_user(&existing.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_merge_never_overwrites() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    let mut payload = google_payload("me@b.com", "Profile", "Name");
    payload["genders"] = serde_json::json!([{"value": "male"}]);
    fetcher.insert("tok", "g1", payload);

    let mut current = User::new("me@b.com");
    current.first_name = "Kept".to_string();
    current.gender = Some("female".to_string());
    store.insert_user(&current).await.unwrap();

    let user = linker(&store, fetcher)
        .resolve_and_link(Provider::Google, "g1", "tok", Some(&current))
        .await
        .unwrap();

    assert_eq!(user.gender.as_deref(), Some("female"));
    assert_eq!(user.first_name, "Kept");
    // Empty fields are filled
    assert_eq!(user.last_name, "Name");
    assert_eq!(
        store.find_user_by_id(&current.id).await.unwrap().unwrap().gender.as_deref(),
        Some("female")
    );
}

#[tokio::test]
async fn test_second_uid_of_same_provider_can_be_linked() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok1", "g1", google_payload("me@b.com", "A", "B"));
    fetcher.insert("tok2", "g2", google_payload("me@b.com", "A", "B"));
    let linker = linker(&store, fetcher);

    let user = linker
        .resolve_and_link(Provider::Google, "g1", "tok1", None)
        .await
        .unwrap();
    let again = linker
        .resolve_and_link(Provider::Google, "g2", "tok2", Some(&user))
        .await
        .unwrap();

    assert_eq!(user.id, again.id);
    assert_eq!(store.links_for_user(&user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_uid_mismatch_fails_verification() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "real-uid", google_payload("a@b.com", "A", "B"));

    let result = linker(&store, fetcher)
        .resolve_and_link(Provider::Google, "claimed-uid", "tok", None)
        .await;

    assert!(matches!(
        result,
        Err(AuthError::ProviderVerificationFailed(_))
    ));
    assert_eq!(store.link_count().await, 0);
}

#[tokio::test]
async fn test_rejected_access_token_fails_verification() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());

    let result = linker(&store, fetcher)
        .resolve_and_link(Provider::Facebook, "fb1", "unknown", None)
        .await;

    assert!(matches!(
        result,
        Err(AuthError::ProviderVerificationFailed(_))
    ));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(500)));
    fetcher.insert("tok", "g1", google_payload("a@b.com", "A", "B"));
    let linker = IdentityLinker::new(
        Arc::new(store.clone()),
        fetcher,
        Duration::from_millis(20),
    );

    let result = linker
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await;

    assert!(matches!(
        result,
        Err(AuthError::ProviderVerificationFailed(_))
    ));
    assert_eq!(store.link_count().await, 0);
}

#[tokio::test]
async fn test_malformed_profile_is_reported() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "g1", serde_json::json!({"resourceName": "people/g1"}));

    let result = linker(&store, fetcher)
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await;

    assert!(matches!(result, Err(AuthError::MalformedProfile(_))));
}

/// Store whose first `commit_link` loses a race to another user.
struct RacingStore {
    inner: MemoryStore,
    raced: AtomicBool,
}

#[async_trait]
impl UserStore for RacingStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_link(
        &self,
        provider: Provider,
        uid: &str,
    ) -> Result<Option<ProviderLink>, StoreError> {
        self.inner.find_link(provider, uid).await
    }

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<ProviderLink>, StoreError> {
        self.inner.links_for_user(user_id).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.insert_user(user).await
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.record_login(user_id, at).await
    }

    async fn commit_link(
        &self,
        user: &User,
        user_is_new: bool,
        link: &ProviderLink,
    ) -> Result<(), StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let winner = User::new("winner@b.com");
            let winning_link = ProviderLink::new(link.provider, &link.uid, &winner.id);
            self.inner.commit_link(&winner, true, &winning_link).await?;
        }
        self.inner.commit_link(user, user_is_new, link).await
    }
}

#[tokio::test]
async fn test_conflict_is_retried_as_re_resolution() {
    let inner = MemoryStore::new();
    let store = Arc::new(RacingStore {
        inner: inner.clone(),
        raced: AtomicBool::new(false),
    });
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "g1", google_payload("loser@b.com", "A", "B"));
    let linker = IdentityLinker::new(store, fetcher, TIMEOUT);

    let user = linker
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await
        .unwrap();

    assert_eq!(user.email, "winner@b.com");
    assert_eq!(inner.link_count().await, 1);
    assert!(inner
        .find_user_by_email("loser@b.com")
        .await
        .unwrap()
        .is_none());
}

/// Store whose every `commit_link` hits a uniqueness conflict.
struct ConflictingStore {
    inner: MemoryStore,
    commits: AtomicUsize,
}

#[async_trait]
impl UserStore for ConflictingStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_link(
        &self,
        provider: Provider,
        uid: &str,
    ) -> Result<Option<ProviderLink>, StoreError> {
        self.inner.find_link(provider, uid).await
    }

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<ProviderLink>, StoreError> {
        self.inner.links_for_user(user_id).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.insert_user(user).await
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.record_login(user_id, at).await
    }

    async fn commit_link(
        &self,
        _user: &User,
        _user_is_new: bool,
        link: &ProviderLink,
    ) -> Result<(), StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict(format!("provider link {}", link.document_id())))
    }
}

#[tokio::test]
async fn test_second_conflict_surfaces_as_persistence_conflict() {
    let inner = MemoryStore::new();
    let store = Arc::new(ConflictingStore {
        inner: inner.clone(),
        commits: AtomicUsize::new(0),
    });
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "g1", google_payload("contended@b.com", "A", "B"));
    let linker = IdentityLinker::new(store.clone(), fetcher, TIMEOUT);

    let result = linker
        .resolve_and_link(Provider::Google, "g1", "tok", None)
        .await;

    assert!(matches!(result, Err(AuthError::PersistenceConflict)));
    assert_eq!(store.commits.load(Ordering::SeqCst), 2);
    assert_eq!(inner.link_count().await, 0);
    assert!(inner
        .find_user_by_email("contended@b.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_linking_merges_into_stored_user_not_stale_snapshot() {
    let store = MemoryStore::new();
    let stale = insert_user(&store, "ada@example.com").await;

    // A concurrent Google link filled the names after `stale` was loaded
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("g-tok", "g1", google_payload("ada@example.com", "Ada", "Lovelace"));
    fetcher.insert("fb-tok", "f1", facebook_payload("ada@example.com", "Augusta", "King"));
    let linker = linker(&store, fetcher);
    linker
        .resolve_and_link(Provider::Google, "g1", "g-tok", None)
        .await
        .unwrap();

    let user = linker
        .resolve_and_link(Provider::Facebook, "f1", "fb-tok", Some(&stale))
        .await
        .unwrap();

    assert_eq!(user.first_name, "Ada");
    assert_eq!(user.last_name, "Lovelace");
    let stored = store.find_user_by_id(&stale.id).await.unwrap().unwrap();
    assert_eq!(stored.first_name, "Ada");
    assert_eq!(store.links_for_user(&stale.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_linking_creates_one_link() {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.insert("tok", "g1", google_payload("race@b.com", "A", "B"));
    let linker = linker(&store, fetcher);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let linker = linker.clone();
            tokio::spawn(async move {
                linker
                    .resolve_and_link(Provider::Google, "g1", "tok", None)
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(store.link_count().await, 1);
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use authlink::config::Config;
use authlink::db::{FirestoreDb, MemoryStore, UserStore};
use authlink::error::AuthError;
use authlink::models::{ExternalProfile, Provider};
use authlink::routes::create_router;
use authlink::services::ProfileFetcher;
use authlink::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Profile fetcher answering from a fixed table keyed by access token.
#[derive(Default)]
pub struct StubFetcher {
    profiles: Mutex<HashMap<String, ExternalProfile>>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `delay` first.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, access_token: &str, uid: &str, raw: Value) {
        self.profiles.lock().unwrap().insert(
            access_token.to_string(),
            ExternalProfile {
                uid: uid.to_string(),
                raw,
            },
        );
    }
}

#[async_trait]
impl ProfileFetcher for StubFetcher {
    async fn fetch(
        &self,
        _provider: Provider,
        access_token: &str,
    ) -> Result<ExternalProfile, AuthError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.profiles
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| AuthError::ProviderVerificationFailed("Invalid access token".into()))
    }
}

/// Google People API payload.
#[allow(dead_code)]
pub fn google_payload(email: &str, given: &str, family: &str) -> Value {
    json!({
        "resourceName": "people/1",
        "emailAddresses": [{"value": email}],
        "names": [{"givenName": given, "familyName": family}],
    })
}

/// Facebook Graph API payload.
#[allow(dead_code)]
pub fn facebook_payload(email: &str, first: &str, last: &str) -> Value {
    json!({
        "id": "fb1",
        "email": email,
        "first_name": first,
        "last_name": last,
    })
}

/// Shared state over an in-memory store and a stub fetcher.
#[allow(dead_code)]
pub fn create_test_state() -> (Arc<AppState>, MemoryStore, Arc<StubFetcher>) {
    create_test_state_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_state_with_config(
    config: Config,
) -> (Arc<AppState>, MemoryStore, Arc<StubFetcher>) {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new());
    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()) as Arc<dyn UserStore>,
        fetcher.clone(),
    ));
    (state, store, fetcher)
}

/// Create a test app with offline dependencies.
/// Returns the router, the shared state and the stub fetcher.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<StubFetcher>) {
    let (state, _, fetcher) = create_test_state();
    (create_router(state.clone()), state, fetcher)
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

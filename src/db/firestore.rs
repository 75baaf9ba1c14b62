// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - User emails (uniqueness index, one document per normalized email)
//! - Providers (one document per `(provider, uid)` pair)
//!
//! Uniqueness is enforced through document IDs: index and link documents
//! are written with an `Exists(false)` precondition inside a transaction,
//! so a concurrent writer fails the commit instead of overwriting.

use super::{collections, StoreError, UserStore};
use crate::models::{normalize_email, Provider, ProviderLink, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};

/// Email index entry pointing at the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailIndex {
    user_id: String,
}

/// Field-masked patch for the login timestamp.
#[derive(Debug, Serialize, Deserialize)]
struct LoginStamp {
    last_login: DateTime<Utc>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }

    fn email_doc_id(email: &str) -> String {
        urlencoding::encode(&normalize_email(email)).into_owned()
    }

    async fn begin(&self) -> Result<firestore::FirestoreTransaction<'_>, StoreError> {
        self.get_client()?
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))
    }

    /// Add an email index document that must not exist yet.
    fn add_email_index(
        &self,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        user: &User,
    ) -> Result<(), StoreError> {
        let index = EmailIndex {
            user_id: user.id.clone(),
        };
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(Self::email_doc_id(&user.email))
            .object(&index)
            .add_to_transaction(transaction)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add email index to transaction: {}", e))
            })?;
        Ok(())
    }

    fn add_user(
        &self,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        user: &User,
    ) -> Result<(), StoreError> {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(transaction)
            .map_err(|e| StoreError::Backend(format!("Failed to add user to transaction: {}", e)))?;
        Ok(())
    }

    async fn commit(&self, transaction: firestore::FirestoreTransaction<'_>) -> Result<(), StoreError> {
        transaction.commit().await.map(|_| ()).map_err(|e| {
            let msg = e.to_string();
            if is_conflict(&msg) {
                StoreError::Conflict(msg)
            } else {
                StoreError::Backend(format!("Transaction commit failed: {}", msg))
            }
        })
    }
}

/// Failed `Exists(false)` preconditions surface as ALREADY_EXISTS or
/// FAILED_PRECONDITION; contended transactions as ABORTED.
fn is_conflict(message: &str) -> bool {
    let upper = message.to_uppercase();
    ["ALREADY_EXISTS", "ALREADYEXISTS", "FAILED_PRECONDITION", "FAILEDPRECONDITION", "ABORTED", "CONFLICT"]
        .iter()
        .any(|needle| upper.contains(needle))
}

#[async_trait]
impl UserStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let index: Option<EmailIndex> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(&Self::email_doc_id(email))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match index {
            Some(index) => self.find_user_by_id(&index.user_id).await,
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut transaction = self.begin().await?;
        self.add_email_index(&mut transaction, user)?;
        self.add_user(&mut transaction, user)?;
        self.commit(transaction).await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    async fn record_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let stamp = LoginStamp { last_login: at };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["last_login"])
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(user_id)
            .object(&stamp)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    // ─── Provider Link Operations ────────────────────────────────

    async fn find_link(
        &self,
        provider: Provider,
        uid: &str,
    ) -> Result<Option<ProviderLink>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROVIDERS)
            .obj()
            .one(&ProviderLink::key(provider, uid))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn links_for_user(&self, user_id: &str) -> Result<Vec<ProviderLink>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROVIDERS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn commit_link(
        &self,
        user: &User,
        user_is_new: bool,
        link: &ProviderLink,
    ) -> Result<(), StoreError> {
        let mut transaction = self.begin().await?;

        if user_is_new {
            self.add_email_index(&mut transaction, user)?;
        }
        self.add_user(&mut transaction, user)?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PROVIDERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(link.document_id())
            .object(link)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add provider link to transaction: {}", e))
            })?;

        self.commit(transaction).await?;

        tracing::info!(
            user_id = %user.id,
            provider = %link.provider,
            user_is_new,
            "Provider link committed"
        );
        Ok(())
    }
}

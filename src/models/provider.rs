// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity providers and the links binding an external uid to a local user.

use crate::error::AuthError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Third-party identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Binds one external identity `(provider, uid)` to one local user.
///
/// The `(provider, uid)` pair is unique across all links. A user may own
/// several links, including more than one uid of the same provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderLink {
    pub provider: Provider,
    /// Provider-scoped external user id
    pub uid: String,
    /// Owning local user
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl ProviderLink {
    pub fn new(provider: Provider, uid: &str, user_id: &str) -> Self {
        Self {
            provider,
            uid: uid.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Unique key for the `(provider, uid)` pair, safe to use as a document ID.
    pub fn key(provider: Provider, uid: &str) -> String {
        format!("{}_{}", provider, urlencoding::encode(uid))
    }

    pub fn document_id(&self) -> String {
        Self::key(self.provider, &self.uid)
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile fetching from Google and Facebook.
//!
//! Handles:
//! - Google People API `people/me` lookup
//! - Facebook Graph API `/me` lookup
//! - Mapping provider failures to `ProviderVerificationFailed`

use crate::error::AuthError;
use crate::models::{ExternalProfile, Provider};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const GOOGLE_PEOPLE_URL: &str = "https://people.googleapis.com/v1/people/me";
const GOOGLE_PERSON_FIELDS: &str = "addresses,emailAddresses,names,genders,birthdays";
const FACEBOOK_ME_URL: &str = "https://graph.facebook.com/me";
const FACEBOOK_FIELDS: &str = "picture,first_name,last_name,name,birthday,gender,email";

/// Fetches the profile behind a provider access token.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Return the raw profile and the uid the provider reports for `access_token`.
    async fn fetch(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<ExternalProfile, AuthError>;
}

/// Profile fetcher calling the providers' public HTTP APIs.
#[derive(Clone)]
pub struct HttpProfileFetcher {
    http: reqwest::Client,
    google_url: String,
    facebook_url: String,
}

impl HttpProfileFetcher {
    pub fn new(timeout: Duration) -> Result<Self, AuthError> {
        Self::with_endpoints(timeout, GOOGLE_PEOPLE_URL, FACEBOOK_ME_URL)
    }

    /// Create a fetcher against custom endpoints (e.g. a local stub server).
    pub fn with_endpoints(
        timeout: Duration,
        google_url: &str,
        facebook_url: &str,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Store(format!("failed building HTTP client: {}", e)))?;

        Ok(Self {
            http,
            google_url: google_url.to_string(),
            facebook_url: facebook_url.to_string(),
        })
    }

    async fn fetch_google(&self, access_token: &str) -> Result<ExternalProfile, AuthError> {
        let response = self
            .http
            .get(&self.google_url)
            .bearer_auth(access_token)
            .query(&[("personFields", GOOGLE_PERSON_FIELDS)])
            .send()
            .await
            .map_err(|e| verification_failed(Provider::Google, e))?;

        let raw = check_response_json(Provider::Google, response).await?;

        // resourceName is "people/{id}"
        let uid = raw
            .get("resourceName")
            .and_then(Value::as_str)
            .and_then(|name| name.split('/').nth(1))
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::ProviderVerificationFailed("Google response has no user id".to_string())
            })?;

        Ok(ExternalProfile { uid, raw })
    }

    async fn fetch_facebook(&self, access_token: &str) -> Result<ExternalProfile, AuthError> {
        let response = self
            .http
            .get(&self.facebook_url)
            .query(&[("fields", FACEBOOK_FIELDS), ("access_token", access_token)])
            .send()
            .await
            .map_err(|e| verification_failed(Provider::Facebook, e))?;

        let raw = check_response_json(Provider::Facebook, response).await?;

        let uid = raw
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::ProviderVerificationFailed(
                    "Facebook response has no user id".to_string(),
                )
            })?;

        Ok(ExternalProfile { uid, raw })
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<ExternalProfile, AuthError> {
        match provider {
            Provider::Google => self.fetch_google(access_token).await,
            Provider::Facebook => self.fetch_facebook(access_token).await,
        }
    }
}

fn verification_failed(provider: Provider, err: reqwest::Error) -> AuthError {
    tracing::warn!(provider = %provider, error = %err, "Provider profile request failed");
    AuthError::ProviderVerificationFailed(format!("{} request failed", provider))
}

/// Check response status and parse the JSON body.
async fn check_response_json(
    provider: Provider,
    response: reqwest::Response,
) -> Result<Value, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider = %provider, status = %status, body = %body, "Provider rejected profile request");

        if status.as_u16() == 401 || status.as_u16() == 403 || status.as_u16() == 400 {
            return Err(AuthError::ProviderVerificationFailed(
                "Invalid access token".to_string(),
            ));
        }
        return Err(AuthError::ProviderVerificationFailed(format!(
            "{} returned HTTP {}",
            provider, status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::ProviderVerificationFailed(format!("{}: {}", provider, e)))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token issuance and verification.
//!
//! Tokens are compact HS256 JWTs carrying `{exp, user_id}`. There is no
//! revocation list: a token is valid until it expires, and rotating the
//! secret invalidates every outstanding token.

use crate::error::AuthError;
use crate::models::User;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Expiration time (Unix timestamp, rounded up to the whole second)
    pub exp: i64,
    pub user_id: String,
}

/// Signs and verifies bearer tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    duration: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], duration: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            duration,
        }
    }

    /// Configured token lifetime.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Issue a token for `user` valid for the configured lifetime.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.issue_with_duration(user, now, self.duration)
    }

    /// Issue a token for `user` expiring at `now + duration`.
    pub fn issue_with_duration(
        &self,
        user: &User,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Result<String, AuthError> {
        let expires = now + duration;
        let claims = Claims {
            exp: expires.timestamp() + i64::from(expires.timestamp_subsec_nanos() > 0),
            user_id: user.id.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenSigning(e.to_string()))
    }

    /// Verify a token and return the user id it was issued for.
    ///
    /// Structure, signature and expiry failures are all reported as
    /// [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock below
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        let token_data = decode::<Claims>(token.trim(), &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if token_data.claims.exp.saturating_mul(1_000) <= now.timestamp_millis() {
            return Err(AuthError::InvalidToken);
        }

        Ok(token_data.claims.user_id)
    }
}

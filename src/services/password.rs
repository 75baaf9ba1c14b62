// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and password policy.
//!
//! Hashes are stored as `pbkdf2_sha256$<iterations>$<salt>$<hash>` with
//! base64 salt and hash.

use crate::error::AuthError;
use crate::models::User;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;

const ALGORITHM_TAG: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

/// Hashes and checks passwords.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Constant-time check of `password` against an encoded hash.
    fn verify(&self, password: &str, encoded: &str) -> bool;

    /// Well-formed hash at the configured cost that no password matches.
    ///
    /// Verified in place of a missing hash so unknown accounts cost the
    /// same as a wrong password.
    fn dummy_hash(&self) -> &str;
}

/// Decides whether a password is acceptable for a user.
pub trait PasswordPolicy: Send + Sync {
    /// Returns every violated rule as a user-facing message.
    fn validate(&self, password: &str, user: &User) -> Result<(), AuthError>;
}

/// PBKDF2-HMAC-SHA256 hasher.
pub struct Pbkdf2Hasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
    dummy: String,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        let iterations = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
        Self {
            iterations,
            rng: SystemRandom::new(),
            dummy: encode(iterations, &[0u8; SALT_LEN], &[0u8; HASH_LEN]),
        }
    }
}

fn encode(iterations: NonZeroU32, salt: &[u8], hash: &[u8]) -> String {
    format!(
        "{}${}${}${}",
        ALGORITHM_TAG,
        iterations,
        BASE64.encode(salt),
        BASE64.encode(hash)
    )
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| AuthError::Store("random generator failure".to_string()))?;

        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(encode(self.iterations, &salt, &hash))
    }

    fn verify(&self, password: &str, encoded: &str) -> bool {
        let parts: Vec<&str> = encoded.split('$').collect();
        let [tag, iterations, salt, hash] = parts.as_slice() else {
            return false;
        };
        if *tag != ALGORITHM_TAG {
            return false;
        }

        let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(hash)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
            return false;
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &hash,
        )
        .is_ok()
    }

    fn dummy_hash(&self) -> &str {
        &self.dummy
    }
}

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "12345678",
    "123456789",
    "11111111",
    "qwerty123",
    "iloveyou",
    "letmein1",
    "abc12345",
    "welcome1",
];

/// Minimum length, not numeric, not common, not similar to the user's attributes.
pub struct DefaultPasswordPolicy {
    pub min_length: usize,
}

impl Default for DefaultPasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn validate(&self, password: &str, user: &User) -> Result<(), AuthError> {
        let mut errors = Vec::new();

        if password.chars().count() < self.min_length {
            errors.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            errors.push("This password is entirely numeric.".to_string());
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            errors.push("This password is too common.".to_string());
        }

        let email_local = user.email.split('@').next().unwrap_or_default();
        let attributes = [
            ("email address", email_local),
            ("first name", user.first_name.as_str()),
            ("last name", user.last_name.as_str()),
        ];
        for (label, value) in attributes {
            let value = value.to_lowercase();
            if value.len() >= 3 && (lowered.contains(&value) || value.contains(&lowered)) {
                errors.push(format!("The password is too similar to the {}.", label));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::WeakPassword(errors))
        }
    }
}

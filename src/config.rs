// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and shared read-only afterwards.

use std::env;
use std::time::Duration;

/// Default bearer token lifetime (1 day).
pub const DEFAULT_TOKEN_DURATION_SECS: i64 = 24 * 60 * 60;
/// Default upper bound on a provider profile fetch.
pub const DEFAULT_PROFILE_FETCH_TIMEOUT_SECS: u64 = 10;
/// Default PBKDF2 work factor for password hashes.
pub const DEFAULT_PASSWORD_HASH_ITERATIONS: u32 = 600_000;

/// Object storage settings for upload signing.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Local development mode: session cookies are sent without `Secure`
    pub debug: bool,
    /// GCP project for Firestore. Without it users are kept in memory.
    pub gcp_project_id: Option<String>,
    /// Bearer token lifetime
    pub token_duration: chrono::Duration,
    /// Upper bound on provider profile fetches
    pub profile_fetch_timeout: Duration,
    pub password_hash_iterations: u32,

    // --- Secrets ---
    /// HMAC key for bearer tokens (raw bytes)
    pub secret_key: Vec<u8>,
    /// Upload signing, disabled when unset
    pub s3: Option<S3Config>,
}

impl Config {
    /// Config for tests: fixed secret, fast password hashing, no storage backends.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            debug: true,
            gcp_project_id: None,
            token_duration: chrono::Duration::seconds(DEFAULT_TOKEN_DURATION_SECS),
            profile_fetch_timeout: Duration::from_secs(DEFAULT_PROFILE_FETCH_TIMEOUT_SECS),
            password_hash_iterations: 1_000,
            secret_key: b"test_secret_key_32_bytes_minimum!".to_vec(),
            s3: Some(S3Config {
                bucket: "test-bucket".to_string(),
                region: "us-east-1".to_string(),
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "test_s3_secret".to_string(),
            }),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let token_secs: i64 = parse_var("TOKEN_DURATION_SECS", DEFAULT_TOKEN_DURATION_SECS)?;
        let token_duration = chrono::Duration::try_seconds(token_secs)
            .filter(|d| *d > chrono::Duration::zero())
            .ok_or_else(|| {
                ConfigError::Invalid("TOKEN_DURATION_SECS", token_secs.to_string())
            })?;

        let s3 = match env::var("S3_BUCKET") {
            Ok(bucket) => Some(S3Config {
                bucket,
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: env::var("S3_ACCESS_KEY_ID")
                    .map_err(|_| ConfigError::Missing("S3_ACCESS_KEY_ID"))?,
                secret_access_key: env::var("S3_SECRET_ACCESS_KEY")
                    .map(|v| v.trim().to_string())
                    .map_err(|_| ConfigError::Missing("S3_SECRET_ACCESS_KEY"))?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_var("PORT", 8080)?,
            debug: parse_var("DEBUG", false)?,
            gcp_project_id: env::var("GCP_PROJECT_ID").ok().filter(|p| !p.is_empty()),
            token_duration,
            profile_fetch_timeout: Duration::from_secs(parse_var(
                "PROFILE_FETCH_TIMEOUT_SECS",
                DEFAULT_PROFILE_FETCH_TIMEOUT_SECS,
            )?),
            password_hash_iterations: parse_var(
                "PASSWORD_HASH_ITERATIONS",
                DEFAULT_PASSWORD_HASH_ITERATIONS,
            )?,
            secret_key: env::var("SECRET_KEY")
                .map_err(|_| ConfigError::Missing("SECRET_KEY"))?
                .into_bytes(),
            s3,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

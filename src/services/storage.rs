// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage upload helpers.
//!
//! Handles:
//! - Per-user upload key naming and validation
//! - AWS Signature V4 pre-signed PUT URLs
//! - Legacy (HMAC-SHA1) S3 POST policy and header signing

use crate::config::S3Config;
use crate::models::User;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use regex::Regex;
use ring::hmac as ring_hmac;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Pre-signed URLs are valid for one hour.
pub const PRESIGNED_URL_EXPIRES_SECS: u32 = 3600;

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Chooses the storage key for a user's upload.
pub trait StorageKeyNamer: Send + Sync {
    fn key_for(&self, user: &User, ext: &str, today: NaiveDate) -> String;
}

/// `u{user_id}/misc/{YYYY-MM-DD}_{uuid}.{ext}`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeyNamer;

impl StorageKeyNamer for DefaultKeyNamer {
    fn key_for(&self, user: &User, ext: &str, today: NaiveDate) -> String {
        format!(
            "u{}/misc/{}_{}.{}",
            user.id,
            today.format("%Y-%m-%d"),
            uuid::Uuid::new_v4(),
            ext
        )
    }
}

/// Check that `key` lies in the user's own upload area.
pub fn validate_upload_key(user_id: &str, key: &str) -> bool {
    let pattern = format!(
        r"^u?{}/(assets|misc)/\d{{4}}-\d{{2}}-\d{{2}}_[0-9a-z-]+\.[^.]+$",
        regex::escape(user_id)
    );
    Regex::new(&pattern).is_ok_and(|re| re.is_match(key))
}

/// Produces pre-signed upload URLs.
pub trait UploadUrlSigner: Send + Sync {
    /// Pre-sign a public-read PUT of `key`.
    fn presign_put(
        &self,
        key: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<String>;
}

/// AWS Signature V4 query-string signer for S3.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    config: S3Config,
    expires_secs: u32,
}

impl SigV4Signer {
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            expires_secs: PRESIGNED_URL_EXPIRES_SECS,
        }
    }

    fn host(&self) -> String {
        if self.config.region == "us-east-1" {
            format!("{}.s3.amazonaws.com", self.config.bucket)
        } else {
            format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region)
        }
    }

    fn presign(
        &self,
        method: &str,
        key: &str,
        extra_query: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
        expires_secs: u32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let host = self.host();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/s3/aws4_request", date, self.config.region);

        // Canonical headers are lowercase and sorted
        let mut headers: BTreeMap<String, String> = extra_headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
            .collect();
        headers.insert("host".to_string(), host.clone());
        let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let credential = format!("{}/{}", self.config.access_key_id, scope);
        let expires = expires_secs.to_string();
        let mut query: BTreeMap<String, String> = BTreeMap::new();
        for (k, v) in [
            ("X-Amz-Algorithm", "AWS4-HMAC-SHA256"),
            ("X-Amz-Credential", credential.as_str()),
            ("X-Amz-Date", amz_date.as_str()),
            ("X-Amz-Expires", expires.as_str()),
            ("X-Amz-SignedHeaders", signed_headers.as_str()),
        ]
        .into_iter()
        .chain(extra_query.iter().copied())
        {
            query.insert(
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            );
        }
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let path = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let canonical_request = format!(
            "{}\n/{}\n{}\n{}\n{}\n{}",
            method, path, canonical_query, canonical_headers, signed_headers, UNSIGNED_PAYLOAD
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret = format!("AWS4{}", self.config.secret_access_key);
        let mut signing_key = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        for part in [self.config.region.as_str(), "s3", "aws4_request"] {
            signing_key = hmac_sha256(&signing_key, part.as_bytes())?;
        }
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        Ok(format!(
            "https://{}/{}?{}&X-Amz-Signature={}",
            host, path, canonical_query, signature
        ))
    }
}

impl UploadUrlSigner for SigV4Signer {
    fn presign_put(
        &self,
        key: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let headers: Vec<(&str, &str)> = content_type
            .map(|ct| vec![("content-type", ct)])
            .unwrap_or_default();
        self.presign(
            "PUT",
            key,
            &[("x-amz-acl", "public-read")],
            &headers,
            self.expires_secs,
            now,
        )
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Signed S3 POST policy.
#[derive(Debug, Serialize, PartialEq)]
pub struct SignedPolicy {
    pub policy: String,
    pub signature: String,
}

/// Base64 the policy document and sign the encoded policy.
pub fn sign_policy_document(policy_document: &Value, secret: &str) -> anyhow::Result<SignedPolicy> {
    let policy = BASE64.encode(serde_json::to_vec(policy_document)?);
    let signature = legacy_sign(secret, policy.as_bytes());
    Ok(SignedPolicy { policy, signature })
}

/// Sign the string-to-sign of a REST/multipart upload request.
pub fn sign_headers(headers: &str, secret: &str) -> String {
    legacy_sign(secret, headers.as_bytes())
}

fn legacy_sign(secret: &str, data: &[u8]) -> String {
    let key = ring_hmac::Key::new(ring_hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_bytes());
    BASE64.encode(ring_hmac::sign(&key, data).as_ref())
}

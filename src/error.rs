// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Token and credential failures are deliberately collapsed into a single
//! variant each: callers never learn whether a token was expired or forged,
//! or whether an email exists.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::middleware::auth::removal_cookie;

/// Failures of the authentication core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired or mis-signed token.
    #[error("Invalid token")]
    InvalidToken,

    /// Access token rejected, uid mismatch, or provider unreachable.
    #[error("Provider verification failed: {0}")]
    ProviderVerificationFailed(String),

    #[error("Malformed provider profile: {0}")]
    MalformedProfile(String),

    #[error("The social account you're trying to use is already linked to another user")]
    ProviderAlreadyLinked,

    #[error("The email address for this account is used by another user")]
    EmailAlreadyInUse,

    /// Concurrent writer won a uniqueness race and the retry lost as well.
    #[error("Conflicting concurrent update, please retry")]
    PersistenceConflict,

    #[error("Password rejected: {}", .0.join(" "))]
    WeakPassword(Vec<String>),

    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Storage error: {0}")]
    Store(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Auth(err) => auth_error_parts(err),
        }
    }
}

fn auth_error_parts(err: &AuthError) -> (StatusCode, &'static str, Option<String>) {
    let details = Some(err.to_string());
    match err {
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
        AuthError::InvalidCredentials => {
            (StatusCode::BAD_REQUEST, "invalid_credentials", details)
        }
        AuthError::ProviderVerificationFailed(_) => {
            (StatusCode::BAD_REQUEST, "provider_verification_failed", details)
        }
        AuthError::MalformedProfile(_) => (StatusCode::BAD_GATEWAY, "malformed_profile", details),
        AuthError::ProviderAlreadyLinked => {
            (StatusCode::CONFLICT, "provider_already_linked", details)
        }
        AuthError::EmailAlreadyInUse => (StatusCode::CONFLICT, "email_already_in_use", details),
        AuthError::PersistenceConflict => (StatusCode::CONFLICT, "persistence_conflict", details),
        AuthError::WeakPassword(_) => (StatusCode::BAD_REQUEST, "weak_password", details),
        AuthError::UnsupportedProvider(_) => {
            (StatusCode::BAD_REQUEST, "unsupported_provider", details)
        }
        AuthError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request", details),
        AuthError::TokenSigning(msg) | AuthError::Store(msg) => {
            tracing::error!(error = %msg, "Authentication backend error");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = self.parts();

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        let mut response = (status, Json(body)).into_response();

        // A rejected session must not keep replaying its cookie
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(value) = HeaderValue::from_str(&removal_cookie(false).to_string()) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::Auth(self).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware and session cookie helpers.

use crate::config::Config;
use crate::error::AppError;
use crate::services::AuthenticatedRequestContext;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Name of the session cookie carrying the bearer token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Request extension set by [`optional_auth`]; `None` for anonymous callers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthenticatedRequestContext>);

/// Session cookie holding `token`, living as long as the token.
pub fn session_cookie(token: &str, config: &Config) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!config.debug)
        .max_age(time::Duration::seconds(config.token_duration.num_seconds()))
        .build()
}

/// Expired session cookie that makes the browser drop it.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Find the token: `Authorization: Bearer` first, then the session cookie.
pub fn extract_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty()),
    }
}

/// Middleware that requires a valid token.
///
/// Inserts [`AuthenticatedRequestContext`] into the request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers(), &jar).ok_or(AppError::Unauthorized)?;
    let context = state.sessions.authenticate(&token).await?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Middleware that authenticates when a token is present.
///
/// Always inserts [`CurrentUser`]. A token that is present but invalid is
/// still rejected.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let context = match extract_token(request.headers(), &jar) {
        Some(token) => Some(state.sessions.authenticate(&token).await?),
        None => None,
    };

    request.extensions_mut().insert(CurrentUser(context));
    Ok(next.run(request).await)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in, registration, provider linking and current-user routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AuthError, Result};
use crate::middleware::auth::{extract_token, removal_cookie, session_cookie, CurrentUser};
use crate::models::{NewUser, Provider, User};
use crate::services::{AuthenticatedRequestContext, Session};
use crate::AppState;

/// Routes open to anonymous callers.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", get(sign_out).post(sign_out))
        .route("/auth/register", post(register))
}

/// Routes that take the caller's identity when there is one.
/// `optional_auth` is applied in routes/mod.rs.
pub fn linking_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/provider", post(provider_sign_in))
}

/// Routes requiring authentication; `require_auth` is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(me))
}

#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct ProviderRequest {
    pub provider: String,
    #[validate(length(min = 1, message = "uid is required"))]
    pub uid: String,
    #[validate(length(min = 1, message = "access_token is required"))]
    pub access_token: String,
}

type SessionResponse = (StatusCode, CookieJar, Json<Value>);

fn validate<T: Validate>(payload: &T) -> Result<()> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Present the session's user and set the session cookie.
async fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: Session,
    status: StatusCode,
) -> Result<SessionResponse> {
    let links = state
        .store
        .links_for_user(&session.user.id)
        .await
        .map_err(AuthError::from)?;
    let body = state
        .presenter
        .present(&session.user, &links, Some(&session.token));
    let jar = jar.add(session_cookie(&session.token, &state.config));

    Ok((status, jar, Json(body)))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<SessionResponse> {
    validate(&payload)?;

    let session = state
        .sessions
        .sign_in_password(&payload.email, &payload.password)
        .await?;

    session_response(&state, jar, session, StatusCode::OK).await
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    state
        .sessions
        .sign_out(extract_token(&headers, &jar).as_deref());

    let jar = jar.add(removal_cookie(!state.config.debug));
    (StatusCode::NO_CONTENT, jar)
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<SessionResponse> {
    validate(&payload)?;

    let new_user = NewUser {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        birthday: payload.birthday,
        gender: payload.gender,
    };
    let session = state.sessions.register(new_user, &payload.password).await?;

    session_response(&state, jar, session, StatusCode::CREATED).await
}

async fn provider_sign_in(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(context)): Extension<CurrentUser>,
    jar: CookieJar,
    Json(payload): Json<ProviderRequest>,
) -> Result<SessionResponse> {
    validate(&payload)?;
    let provider: Provider = payload.provider.parse()?;

    let current_user: Option<&User> = context.as_ref().map(|c| &c.user);
    let session = state
        .sessions
        .sign_in_provider(provider, &payload.uid, &payload.access_token, current_user)
        .await?;

    session_response(&state, jar, session, StatusCode::OK).await
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthenticatedRequestContext>,
) -> Result<Json<Value>> {
    let links = state
        .store
        .links_for_user(&context.user.id)
        .await
        .map_err(AuthError::from)?;

    Ok(Json(state.presenter.present(&context.user, &links, None)))
}

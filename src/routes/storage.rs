// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload signing routes for authenticated users.
//! The auth middleware is applied in routes/mod.rs for these routes.

use crate::config::S3Config;
use crate::error::{AppError, Result};
use crate::services::storage::{sign_headers, sign_policy_document, validate_upload_key};
use crate::services::{AuthenticatedRequestContext, UploadUrlSigner};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/s3", get(presigned_url))
        .route("/auth/s3/signature", post(sign_upload))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignParams {
    pub object_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub signed_url: String,
}

fn storage_config(state: &AppState) -> Result<&S3Config> {
    state
        .config
        .s3
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("object storage is not configured")))
}

/// Pre-signed PUT URL for a new object in the caller's upload area.
async fn presigned_url(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthenticatedRequestContext>,
    Query(params): Query<PresignParams>,
) -> Result<Json<PresignResponse>> {
    let signer: &dyn UploadUrlSigner = state
        .upload_signer
        .as_deref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("object storage is not configured")))?;

    let ext = params.object_name.rsplit('.').next().unwrap_or_default();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::BadRequest("Invalid object name".to_string()));
    }

    let now = Utc::now();
    let key = state
        .key_namer
        .key_for(&context.user, ext, now.date_naive());
    if !validate_upload_key(&context.user.id, &key) {
        tracing::warn!(user_id = %context.user.id, key = %key, "Generated upload key rejected");
        return Err(AppError::BadRequest("Wrong S3 Key".to_string()));
    }

    let signed_url = signer.presign_put(&key, params.content_type.as_deref(), now)?;
    tracing::info!(user_id = %context.user.id, key = %key, "Upload URL signed");

    Ok(Json(PresignResponse { signed_url }))
}

/// Sign either a multipart request's headers or a POST policy document.
async fn sign_upload(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AuthenticatedRequestContext>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>> {
    let secret = &storage_config(&state)?.secret_access_key;

    let response = match payload.get("headers") {
        Some(Value::String(headers)) if !headers.is_empty() => {
            json!({ "signature": sign_headers(headers, secret) })
        }
        Some(Value::Null) | None => {
            let signed = sign_policy_document(&payload, secret)?;
            serde_json::to_value(signed).map_err(anyhow::Error::from)?
        }
        Some(_) => {
            return Err(AppError::BadRequest(
                "headers must be a non-empty string".to_string(),
            ))
        }
    };

    tracing::debug!(user_id = %context.user.id, "Upload signature issued");
    Ok(Json(response))
}

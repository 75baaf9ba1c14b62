// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authlink API Server
//!
//! Password and social sign-in with identity linking, issuing stateless
//! bearer tokens.

use authlink::{
    config::Config,
    db::{FirestoreDb, MemoryStore, UserStore},
    services::HttpProfileFetcher,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, debug = config.debug, "Starting Authlink API");

    // Users live in Firestore when a project is configured
    let store: Arc<dyn UserStore> = match &config.gcp_project_id {
        Some(project_id) => {
            let db = FirestoreDb::new(project_id).await?;
            tracing::info!(project = %project_id, "Firestore store initialized");
            Arc::new(db)
        }
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, keeping users in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let fetcher = Arc::new(HttpProfileFetcher::new(config.profile_fetch_timeout)?);
    if config.s3.is_none() {
        tracing::warn!("S3_BUCKET not set, upload signing disabled");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, fetcher));

    // Build router
    let app = authlink::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("authlink=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

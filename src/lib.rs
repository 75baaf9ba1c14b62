// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Authlink: account authentication with social identity linking
//!
//! This crate provides a backend API for password accounts, Google and
//! Facebook sign-in with account linking, stateless bearer tokens and
//! per-user upload signing.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserStore;
use services::{
    DefaultKeyNamer, DefaultPasswordPolicy, IdentityLinker, JsonApiPresenter, Pbkdf2Hasher,
    ProfileFetcher, SessionService, SigV4Signer, StorageKeyNamer, TokenCodec, UploadUrlSigner,
    UserPresenter,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UserStore>,
    pub sessions: SessionService,
    pub presenter: Arc<dyn UserPresenter>,
    pub key_namer: Arc<dyn StorageKeyNamer>,
    /// Absent when object storage is not configured
    pub upload_signer: Option<Arc<dyn UploadUrlSigner>>,
}

impl AppState {
    /// Wire the default strategies around a store and a profile fetcher.
    pub fn new(config: Config, store: Arc<dyn UserStore>, fetcher: Arc<dyn ProfileFetcher>) -> Self {
        let tokens = TokenCodec::new(&config.secret_key, config.token_duration);
        let linker = IdentityLinker::new(store.clone(), fetcher, config.profile_fetch_timeout);
        let sessions = SessionService::new(
            store.clone(),
            tokens,
            linker,
            Arc::new(Pbkdf2Hasher::new(config.password_hash_iterations)),
            Arc::new(DefaultPasswordPolicy::default()),
        );
        let upload_signer = config
            .s3
            .clone()
            .map(|s3| Arc::new(SigV4Signer::new(s3)) as Arc<dyn UploadUrlSigner>);

        Self {
            config,
            store,
            sessions,
            presenter: Arc::new(JsonApiPresenter),
            key_namer: Arc::new(DefaultKeyNamer),
            upload_signer,
        }
    }
}

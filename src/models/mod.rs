// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod profile;
pub mod provider;
pub mod user;

pub use profile::{ExternalProfile, NormalizedProfile};
pub use provider::{Provider, ProviderLink};
pub use user::{normalize_email, NewUser, User};

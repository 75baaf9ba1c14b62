// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider profile payloads.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

/// Raw profile returned by a provider, together with the uid the provider reported.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub uid: String,
    pub raw: Value,
}

/// Canonical profile fields understood by the linking service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub birthday: Option<NaiveDate>,
    /// Profile picture URL
    pub picture: Option<String>,
    /// Remaining provider fields, kept as received
    pub extra: Map<String, Value>,
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User response shaping.

use crate::models::{ProviderLink, User};
use crate::time_utils::format_utc_rfc3339;
use serde_json::{json, Value};

/// Turns a user into a response document.
pub trait UserPresenter: Send + Sync {
    fn present(&self, user: &User, links: &[ProviderLink], token: Option<&str>) -> Value;
}

/// JSON:API style `users` resource document.
///
/// The token, when present, goes in the top-level `meta.access_token`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonApiPresenter;

impl UserPresenter for JsonApiPresenter {
    fn present(&self, user: &User, links: &[ProviderLink], token: Option<&str>) -> Value {
        let providers: Vec<Value> = links
            .iter()
            .map(|link| {
                json!({
                    "type": "providers",
                    "id": link.document_id(),
                    "attributes": { "provider": link.provider, "uid": link.uid },
                })
            })
            .collect();

        let mut document = json!({
            "data": {
                "type": "users",
                "id": user.id,
                "attributes": {
                    "email": user.email,
                    "first_name": user.first_name,
                    "last_name": user.last_name,
                    "birthday": user.birthday,
                    "gender": user.gender,
                    "last_login": user.last_login.map(format_utc_rfc3339),
                },
                "relationships": {
                    "providers": { "data": providers },
                },
            }
        });

        if let Some(token) = token {
            document["meta"] = json!({ "access_token": token });
        }
        document
    }
}

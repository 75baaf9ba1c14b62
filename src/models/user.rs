// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::models::NormalizedProfile;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Local account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identifier (also used as document ID)
    pub id: String,
    /// Email address, unique and case-normalized
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    /// Encoded password hash. `None` for accounts created through a provider.
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Last successful authentication
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes supplied at registration.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
}

/// Canonical form of an email address used for uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Create an empty user with a fresh identifier.
    pub fn new(email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: normalize_email(email),
            first_name: String::new(),
            last_name: String::new(),
            birthday: None,
            gender: None,
            password_hash: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_registration(new_user: NewUser) -> Self {
        let mut user = Self::new(&new_user.email);
        user.first_name = new_user.first_name;
        user.last_name = new_user.last_name;
        user.birthday = new_user.birthday;
        user.gender = new_user.gender.filter(|g| !g.is_empty());
        user
    }

    /// Fill empty attributes from a provider profile.
    ///
    /// Attributes that already hold a value are never overwritten.
    /// Returns true if anything changed.
    pub fn merge_profile(&mut self, profile: &NormalizedProfile) -> bool {
        let mut changed = false;

        if self.email.is_empty() && !profile.email.is_empty() {
            self.email = normalize_email(&profile.email);
            changed = true;
        }
        changed |= fill_string(&mut self.first_name, &profile.first_name);
        changed |= fill_string(&mut self.last_name, &profile.last_name);

        if self.birthday.is_none() && profile.birthday.is_some() {
            self.birthday = profile.birthday;
            changed = true;
        }

        let gender_empty = self.gender.as_deref().map_or(true, str::is_empty);
        if gender_empty {
            if let Some(gender) = profile.gender.as_deref().filter(|g| !g.is_empty()) {
                self.gender = Some(gender.to_string());
                changed = true;
            }
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}

fn fill_string(target: &mut String, value: &str) -> bool {
    if target.is_empty() && !value.is_empty() {
        *target = value.to_string();
        true
    } else {
        false
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} <{}>", self.first_name, self.last_name, self.email)
    }
}

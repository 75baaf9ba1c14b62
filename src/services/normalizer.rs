// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider profile normalization.
//!
//! Maps the Google People API and Facebook Graph API payload shapes onto
//! [`NormalizedProfile`]. Pure functions with no I/O.

use crate::error::AuthError;
use crate::models::{NormalizedProfile, Provider};
use crate::time_utils::parse_us_date;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Normalize a raw profile from `provider`.
pub fn normalize(provider: Provider, raw: &Value) -> Result<NormalizedProfile, AuthError> {
    match provider {
        Provider::Google => normalize_google(raw),
        Provider::Facebook => normalize_facebook(raw),
    }
}

// ─── Google ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePerson {
    #[serde(default)]
    email_addresses: Vec<GoogleValue>,
    #[serde(default)]
    names: Vec<GoogleName>,
    #[serde(default)]
    genders: Vec<GoogleValue>,
    #[serde(default)]
    birthdays: Vec<GoogleBirthday>,
}

#[derive(Deserialize)]
struct GoogleValue {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleName {
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

#[derive(Deserialize)]
struct GoogleBirthday {
    date: Option<GoogleDate>,
}

/// Google omits `year` for birthdays shared without one.
#[derive(Deserialize)]
struct GoogleDate {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

impl GoogleDate {
    fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)
    }
}

/// Normalize a Google People API `people/me` payload.
///
/// `emailAddresses` and `names` are required; gender and birthday are optional.
pub fn normalize_google(raw: &Value) -> Result<NormalizedProfile, AuthError> {
    let person = GooglePerson::deserialize(raw)
        .map_err(|e| AuthError::MalformedProfile(format!("google: {}", e)))?;

    let email = person
        .email_addresses
        .first()
        .map(|e| e.value.clone())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::MalformedProfile("google: missing emailAddresses".to_string()))?;

    let name = person
        .names
        .first()
        .ok_or_else(|| AuthError::MalformedProfile("google: missing names".to_string()))?;

    Ok(NormalizedProfile {
        email,
        first_name: name.given_name.clone(),
        last_name: name.family_name.clone(),
        gender: person
            .genders
            .first()
            .map(|g| g.value.clone())
            .filter(|g| !g.is_empty()),
        birthday: person
            .birthdays
            .first()
            .and_then(|b| b.date.as_ref())
            .and_then(GoogleDate::to_date),
        picture: None,
        extra: Map::new(),
    })
}

// ─── Facebook ────────────────────────────────────────────────

/// Normalize a Facebook Graph API `/me` payload.
///
/// All raw fields are kept. A `MM/DD/YYYY` birthday becomes a date; any
/// other birthday string stays in `extra` untouched. A nested `picture`
/// is flattened to its URL.
pub fn normalize_facebook(raw: &Value) -> Result<NormalizedProfile, AuthError> {
    let mut fields = raw
        .as_object()
        .cloned()
        .ok_or_else(|| AuthError::MalformedProfile("facebook: expected an object".to_string()))?;

    let email = take_string(&mut fields, "email")
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::MalformedProfile("facebook: missing email".to_string()))?;

    let birthday = fields
        .get("birthday")
        .and_then(Value::as_str)
        .and_then(parse_us_date);
    if birthday.is_some() {
        fields.remove("birthday");
    }

    let picture = match fields.remove("picture") {
        Some(Value::String(url)) => Some(url),
        Some(nested) => nested
            .pointer("/data/url")
            .and_then(Value::as_str)
            .map(str::to_string),
        None => None,
    };

    Ok(NormalizedProfile {
        email,
        first_name: take_string(&mut fields, "first_name").unwrap_or_default(),
        last_name: take_string(&mut fields, "last_name").unwrap_or_default(),
        gender: take_string(&mut fields, "gender").filter(|g| !g.is_empty()),
        birthday,
        picture,
        extra: fields,
    })
}

/// Remove `key` if it holds a string; other value types stay in place.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            fields.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_google_without_optional_fields() {
        let raw = json!({
            "emailAddresses": [{"value": "a@b.com"}],
            "names": [{"givenName": "A", "familyName": "B"}]
        });
        let profile = normalize_google(&raw).unwrap();
        assert_eq!(profile.gender, None);
        assert_eq!(profile.birthday, None);
    }

    #[test]
    fn test_google_birthday_without_year() {
        let raw = json!({
            "emailAddresses": [{"value": "a@b.com"}],
            "names": [{"givenName": "A", "familyName": "B"}],
            "birthdays": [{"date": {"month": 2, "day": 25}}]
        });
        assert_eq!(normalize_google(&raw).unwrap().birthday, None);
    }

    #[test]
    fn test_take_string_keeps_non_strings() {
        let mut fields = json!({"gender": 3}).as_object().cloned().unwrap();
        assert_eq!(take_string(&mut fields, "gender"), None);
        assert!(fields.contains_key("gender"));
    }
}

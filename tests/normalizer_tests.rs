// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider profile normalization tests.

use authlink::error::AuthError;
use authlink::models::Provider;
use authlink::services::normalizer::{normalize, normalize_facebook, normalize_google};
use chrono::NaiveDate;
use serde_json::json;

#[test]
fn test_google_profile() {
    let data = json!({
        "emailAddresses": [{"value": "a@b.com"}],
        "names": [{"givenName": "A", "familyName": "B"}],
        "genders": [{"value": "male"}],
        "birthdays": [{"date": {"year": 1970, "month": 2, "day": 25}}]
    });

    let profile = normalize_google(&data).unwrap();

    assert_eq!(profile.email, "a@b.com");
    assert_eq!(profile.first_name, "A");
    assert_eq!(profile.last_name, "B");
    assert_eq!(profile.gender.as_deref(), Some("male"));
    assert_eq!(profile.birthday, NaiveDate::from_ymd_opt(1970, 2, 25));
}

#[test]
fn test_google_profile_missing_required_fields() {
    let no_email = json!({"names": [{"givenName": "A", "familyName": "B"}]});
    assert!(matches!(
        normalize_google(&no_email),
        Err(AuthError::MalformedProfile(_))
    ));

    let no_names = json!({"emailAddresses": [{"value": "a@b.com"}]});
    assert!(matches!(
        normalize_google(&no_names),
        Err(AuthError::MalformedProfile(_))
    ));

    let wrong_shape = json!({"emailAddresses": "a@b.com"});
    assert!(matches!(
        normalize_google(&wrong_shape),
        Err(AuthError::MalformedProfile(_))
    ));
}

#[test]
fn test_facebook_profile() {
    let data = json!({
        "id": "10",
        "email": "some@email.com",
        "first_name": "Alfred",
        "last_name": "Dupont",
        "gender": "male",
        "birthday": "02/25/1970",
        "name": "Alfred Dupont",
        "picture": {"data": {"url": "https://example.com/a.jpg"}}
    });

    let profile = normalize_facebook(&data).unwrap();

    assert_eq!(profile.email, "some@email.com");
    assert_eq!(profile.first_name, "Alfred");
    assert_eq!(profile.last_name, "Dupont");
    assert_eq!(profile.gender.as_deref(), Some("male"));
    assert_eq!(profile.birthday, NaiveDate::from_ymd_opt(1970, 2, 25));
    assert_eq!(profile.picture.as_deref(), Some("https://example.com/a.jpg"));
    assert_eq!(profile.extra.get("name"), Some(&json!("Alfred Dupont")));
    assert_eq!(profile.extra.get("id"), Some(&json!("10")));
    assert!(!profile.extra.contains_key("birthday"));
}

#[test]
fn test_facebook_malformed_birthday_is_left_untouched() {
    let data = json!({"email": "a@b.com", "birthday": "not-a-date"});

    let profile = normalize_facebook(&data).unwrap();

    assert_eq!(profile.birthday, None);
    assert_eq!(profile.extra.get("birthday"), Some(&json!("not-a-date")));
}

#[test]
fn test_facebook_without_email_is_malformed() {
    let data = json!({"id": "10", "first_name": "Alfred"});
    assert!(matches!(
        normalize_facebook(&data),
        Err(AuthError::MalformedProfile(_))
    ));
}

#[test]
fn test_normalization_is_deterministic() {
    let google = json!({
        "emailAddresses": [{"value": "a@b.com"}],
        "names": [{"givenName": "A", "familyName": "B"}],
        "birthdays": [{"date": {"year": 1970, "month": 2, "day": 25}}]
    });
    let facebook = json!({
        "email": "a@b.com",
        "birthday": "02/25/1970",
        "hometown": {"name": "Paris"}
    });

    for _ in 0..10 {
        assert_eq!(
            normalize(Provider::Google, &google).unwrap(),
            normalize(Provider::Google, &google).unwrap()
        );
        assert_eq!(
            normalize(Provider::Facebook, &facebook).unwrap(),
            normalize(Provider::Facebook, &facebook).unwrap()
        );
    }
}

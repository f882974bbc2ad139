//! User identity model.
//!
//! Credential storage and token issuance live outside this core; services
//! receive the authenticated [`User`] as an explicit parameter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique, case-normalized to lowercase at registration.
    pub email: String,
    pub avatar_url: Option<String>,
    pub language: String,
    /// Soft-disable flag; users are never hard-deleted.
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record with a generated id. The email is normalized
    /// to lowercase here so every downstream comparison can be exact.
    pub fn new(name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name: name.trim().to_string(),
            email: normalize_email(&email),
            avatar_url: None,
            language: "en".to_string(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// id + name projection used in response payloads.
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Minimal user projection embedded in responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

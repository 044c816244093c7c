//! User model - globally unique accounts identified by email.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    /// SHA-256 fingerprint of the single refresh token currently honoured.
    pub refresh_token_hash: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub row_version: i64,
}

impl User {
    /// Create a new, not yet persisted user.
    pub fn new(display_name: String, email: String, password_hash: String) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            display_name,
            email: normalize_email(&email),
            password_hash,
            refresh_token_hash: None,
            created_utc: Utc::now(),
            row_version: 0,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            email: self.email.clone(),
        }
    }
}

/// Who is making a request, as resolved from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// Emails compare case-insensitively and are stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

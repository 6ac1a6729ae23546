/// User model
///
/// A user owns its credentials and the set of refresh tokens that are still
/// valid for it. The set is the revocation mechanism layered on top of
/// stateless token signing: a refresh token that is not in the set is
/// unusable even when its signature and expiry check out.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE user_refresh_tokens (
///     id BIGSERIAL PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, token)
/// );
/// ```
///
/// Persistence goes through [`crate::store::CredentialStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account with its valid refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique and case-sensitive as stored
    pub email: String,

    /// Argon2id password hash
    ///
    /// Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Refresh tokens issued to this user that have not been rotated away or revoked,
    /// oldest first
    #[serde(skip_serializing)]
    pub refresh_tokens: Vec<String>,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user record was last mutated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether `token` is currently in this user's valid refresh-token set
    pub fn has_refresh_token(&self, token: &str) -> bool {
        self.refresh_tokens.iter().any(|t| t == token)
    }
}

/// Input for creating a new user
///
/// The ID is assigned here, before the single insert, so that the first
/// refresh token can be issued for it and stored in the same write.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// ID the user will be stored under
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Initial refresh-token set
    pub refresh_tokens: Vec<String>,
}

impl NewUser {
    /// Prepares a user record with a fresh ID and an empty token set
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            refresh_tokens: Vec::new(),
        }
    }

    /// Adds a refresh token to the initial set
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_tokens.push(token.into());
        self
    }
}

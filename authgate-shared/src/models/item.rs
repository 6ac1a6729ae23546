/// Item model
///
/// Items are the per-user resources sitting behind bearer authorization.
/// They are only ever listed, created or deleted on behalf of their owner.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE items (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum item name length, in characters
pub const MAX_NAME_LEN: usize = 100;

/// Item owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    /// Unique item ID
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    /// Display name
    pub name: String,

    /// When the item was created
    pub created_at: DateTime<Utc>,

    /// When the item was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an item
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Owner
    pub user_id: Uuid,

    /// Display name, already trimmed
    pub name: String,
}

impl NewItem {
    /// Trims `name` and checks it is 1 to [`MAX_NAME_LEN`] characters long
    pub fn new(user_id: Uuid, name: &str) -> Result<Self, String> {
        let name = name.trim();

        if name.is_empty() {
            return Err("Item name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err("Item name too long".to_string());
        }

        Ok(Self {
            user_id,
            name: name.to_string(),
        })
    }
}

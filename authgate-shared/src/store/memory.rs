// In-memory store for development and tests
// All data lives behind one parking_lot lock and is lost on restart.
// Mutations take the write guard once and never await while holding it,
// so each read-modify-write is atomic.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CredentialStore, ItemStore, Rotation, StoreError};
use crate::models::{
    item::{Item, NewItem},
    user::{NewUser, User},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    items: HashMap<Uuid, Item>,
}

/// In-memory [`CredentialStore`] and [`ItemStore`]
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(&self, input: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.emails.contains_key(&input.email) {
            return Err(StoreError::EmailTaken);
        }

        let now = Utc::now();
        let user = User {
            id: input.id,
            email: input.email,
            password_hash: input.password_hash,
            refresh_tokens: input.refresh_tokens,
            created_at: now,
            updated_at: now,
        };

        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.read().users.contains_key(&id))
    }

    async fn add_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(false);
        };

        if !user.has_refresh_token(token) {
            user.refresh_tokens.push(token.to_string());
        }
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<Rotation, StoreError> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(Rotation::UserNotFound);
        };

        let Some(position) = user.refresh_tokens.iter().position(|t| t == old) else {
            return Ok(Rotation::Revoked);
        };

        user.refresh_tokens.remove(position);
        user.refresh_tokens.push(new.to_string());
        user.updated_at = Utc::now();
        Ok(Rotation::Rotated)
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(false);
        };

        let before = user.refresh_tokens.len();
        user.refresh_tokens.retain(|t| t != token);
        if user.refresh_tokens.len() == before {
            return Ok(false);
        }

        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn create_item(&self, input: NewItem) -> Result<Item, StoreError> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&input.user_id) {
            return Err(StoreError::UnknownUser(input.user_id));
        }

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            name: input.name,
            created_at: now,
            updated_at: now,
        };
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn list_items(&self, user_id: Uuid) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<Item> = self
            .tables
            .read()
            .items
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn delete_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let owned = tables
            .items
            .get(&item_id)
            .is_some_and(|item| item.user_id == user_id);

        if owned {
            tables.items.remove(&item_id);
        }
        Ok(owned)
    }
}

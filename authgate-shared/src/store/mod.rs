/// Persistence contracts for users, their refresh tokens, and items
///
/// The session core never touches a database directly. It talks to a
/// [`CredentialStore`], whose token-set operations are each one atomic
/// read-modify-write per user. Two implementations are provided:
///
/// - [`memory::MemoryStore`]: everything behind a single lock, for development and tests
/// - [`postgres::PgStore`]: PostgreSQL with row-level locking on the user record
///
/// # Example
///
/// ```
/// use authgate_shared::models::user::NewUser;
/// use authgate_shared::store::{memory::MemoryStore, CredentialStore, Rotation};
///
/// # async fn example() -> Result<(), authgate_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store
///     .insert_user(NewUser::new("a@x.com", "$argon2id$...").with_refresh_token("r1"))
///     .await?;
///
/// let rotation = store.rotate_refresh_token(user.id, "r1", "r2").await?;
/// assert_eq!(rotation, Rotation::Rotated);
///
/// // The old token is gone, so a replay loses
/// let replay = store.rotate_refresh_token(user.id, "r1", "r3").await?;
/// assert_eq!(replay, Rotation::Revoked);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    item::{Item, NewItem},
    user::{NewUser, User},
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another user already has this email
    #[error("Email already registered")]
    EmailTaken,

    /// Referenced user does not exist
    #[error("Unknown user: {0}")]
    UnknownUser(Uuid),

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of an atomic refresh-token swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Old token removed, new token added
    Rotated,

    /// Old token was not in the set; nothing changed
    Revoked,

    /// No such user; nothing changed
    UserNotFound,
}

/// Persists users and their valid refresh-token sets
///
/// Every method that changes a token set is a single atomic update with
/// respect to other writers of the same user, and bumps `updated_at`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts a new user together with its initial refresh tokens
    ///
    /// # Errors
    ///
    /// Returns `StoreError::EmailTaken` if the email is already registered
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Finds a user by exact email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Finds a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Whether a user with this ID exists
    async fn user_exists(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Appends a refresh token to the user's set
    ///
    /// Returns `false` if the user does not exist.
    async fn add_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError>;

    /// Removes `old` from the user's set and inserts `new`, as one update
    ///
    /// For a given `old` token at most one call ever returns `Rotation::Rotated`.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<Rotation, StoreError>;

    /// Removes a refresh token from the user's set
    ///
    /// Returns `false` if the user or the token was not found.
    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError>;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Persists per-user items
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Creates an item
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownUser` if the owner does not exist
    async fn create_item(&self, item: NewItem) -> Result<Item, StoreError>;

    /// Lists a user's items, newest first
    async fn list_items(&self, user_id: Uuid) -> Result<Vec<Item>, StoreError>;

    /// Deletes an item owned by `user_id`
    ///
    /// Returns `false` if the item does not exist or belongs to someone else.
    async fn delete_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, StoreError>;
}

/// PostgreSQL-backed store
///
/// Refresh tokens live in `user_refresh_tokens`, one row per valid token.
/// Every token-set mutation runs in a transaction that first locks the
/// owning `users` row with `SELECT ... FOR UPDATE`, which serializes all
/// writers of the same user. Dropping a transaction without committing rolls
/// it back, so a cancelled rotation leaves the set untouched.
///
/// # Example
///
/// ```no_run
/// use authgate_shared::db::pool::{create_pool, DatabaseConfig};
/// use authgate_shared::store::{postgres::PgStore, CredentialStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
///
/// let user = store.find_by_email("a@x.com").await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{CredentialStore, ItemStore, Rotation, StoreError};
use crate::models::{
    item::{Item, NewItem},
    user::{NewUser, User},
};

const SELECT_USER: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.created_at, u.updated_at,
           COALESCE(
               array_agg(t.token ORDER BY t.id) FILTER (WHERE t.token IS NOT NULL),
               '{}'
           ) AS refresh_tokens
    FROM users u
    LEFT JOIN user_refresh_tokens t ON t.user_id = u.id
"#;

/// PostgreSQL [`CredentialStore`] and [`ItemStore`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Locks the user row for the rest of the transaction
///
/// Returns `false` if the user does not exist.
async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

async fn insert_token(conn: &mut PgConnection, user_id: Uuid, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_refresh_tokens (user_id, token)
        VALUES ($1, $2)
        ON CONFLICT (user_id, token) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(token)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn touch_user(conn: &mut PgConnection, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

fn map_insert_error(err: sqlx::Error, user_id: Uuid) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::EmailTaken,
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StoreError::UnknownUser(user_id)
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_user(&self, input: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(&input.email)
        .bind(&input.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, input.id))?;

        for token in &input.refresh_tokens {
            insert_token(&mut tx, input.id, token).await?;
        }

        tx.commit().await?;
        debug!(user_id = %input.id, "User inserted");

        Ok(User {
            id: input.id,
            email: input.email,
            password_hash: input.password_hash,
            refresh_tokens: input.refresh_tokens,
            created_at,
            updated_at,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("{} WHERE u.email = $1 GROUP BY u.id", SELECT_USER);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("{} WHERE u.id = $1 GROUP BY u.id", SELECT_USER);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn user_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn add_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_user(&mut tx, user_id).await? {
            return Ok(false);
        }

        insert_token(&mut tx, user_id, token).await?;
        touch_user(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
    ) -> Result<Rotation, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_user(&mut tx, user_id).await? {
            return Ok(Rotation::UserNotFound);
        }

        let removed = sqlx::query("DELETE FROM user_refresh_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(old)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Ok(Rotation::Revoked);
        }

        insert_token(&mut tx, user_id, new).await?;
        touch_user(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(Rotation::Rotated)
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_user(&mut tx, user_id).await? {
            return Ok(false);
        }

        let removed = sqlx::query("DELETE FROM user_refresh_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Ok(false);
        }

        touch_user(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn create_item(&self, input: NewItem) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, user_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, input.user_id))?;

        Ok(item)
    }

    async fn list_items(&self, user_id: Uuid) -> Result<Vec<Item>, StoreError> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, user_id, name, created_at, updated_at
            FROM items
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn delete_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

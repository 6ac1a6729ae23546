/// Session lifecycle: register, login, refresh, logout
///
/// A session is a token pair. The access token is verified statelessly on
/// every request; the refresh token is additionally tracked in the owning
/// user's refresh-token set, which is what makes rotation and revocation
/// possible:
///
/// ```text
///   issued ──► Active ──refresh──► Consumed (replaced by its successor)
///                 │
///                 └────logout────► Revoked
/// ```
///
/// Only presence in the set distinguishes `Active` from the two terminal
/// states. Every change to the set goes through one atomic
/// [`CredentialStore`] operation, so for a given refresh token at most one
/// `refresh` call ever succeeds.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use authgate_shared::auth::jwt::{TokenConfig, TokenIssuer};
/// use authgate_shared::auth::password::PasswordHasher;
/// use authgate_shared::auth::session::{SessionError, SessionService};
/// use authgate_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), SessionError> {
/// let sessions = SessionService::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(TokenIssuer::new(TokenConfig::new(
///         "access-secret-at-least-32-bytes-long!!",
///         "refresh-secret-at-least-32-bytes-long!",
///     ))),
///     PasswordHasher::default(),
/// );
///
/// let first = sessions.register("a@x.com", "Passw0rd!").await?;
/// let second = sessions.refresh(&first.refresh_token).await?;
///
/// // The first refresh token was consumed by the rotation
/// assert!(matches!(
///     sessions.refresh(&first.refresh_token).await,
///     Err(SessionError::RefreshTokenRevoked)
/// ));
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::{TokenClass, TokenError, TokenIssuer, TokenPair};
use super::password::{PasswordError, PasswordHasher};
use crate::models::user::NewUser;
use crate::store::{CredentialStore, Rotation, StoreError};

/// Plaintext behind the hash that unknown-email logins are checked against
const DUMMY_PASSWORD: &str = "authgate-dummy-password";

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Email is already registered
    #[error("User already exists")]
    UserExists,

    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Token refers to a user that no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Refresh token failed signature, expiry or format checks
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Refresh token is genuine but no longer in the user's set
    #[error("Refresh token has been revoked")]
    RefreshTokenRevoked,

    /// Access token failed signature, expiry or format checks
    #[error("Invalid access token")]
    InvalidAccessToken,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenIssue(#[from] TokenError),

    /// Blocking hash task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Orchestrates password checks, token issuance and refresh-token bookkeeping
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    dummy_hash: OnceCell<String>,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: Arc<TokenIssuer>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            issuer,
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Computes the dummy hash that unknown-email logins verify against
    ///
    /// Call once before serving, so the first unknown-email login costs the
    /// same single verification as every later one. It also surfaces invalid
    /// argon2 parameters at startup.
    pub async fn warm_up(&self) -> Result<(), SessionError> {
        self.dummy_hash().await?;
        Ok(())
    }

    /// Token issuer, for callers that need the configured TTLs
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Creates a user and opens its first session
    ///
    /// The user is stored with the new refresh token already in its set, in
    /// a single write.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UserExists` if the email is taken
    pub async fn register(&self, email: &str, password: &str) -> Result<TokenPair, SessionError> {
        if self.store.find_by_email(email).await?.is_some() {
            return Err(SessionError::UserExists);
        }

        let password_hash = self.hash_password(password).await?;
        let new_user = NewUser::new(email, password_hash);
        let pair = self.issuer.issue_pair(new_user.id)?;

        let user = self
            .store
            .insert_user(new_user.with_refresh_token(pair.refresh_token.clone()))
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                StoreError::EmailTaken => SessionError::UserExists,
                other => SessionError::Store(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(pair)
    }

    /// Verifies credentials and opens a new session
    ///
    /// Existing sessions of the user stay valid.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidCredentials` for an unknown email and
    /// for a wrong password alike
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, SessionError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            // Same argon2 cost as the known-email path
            let dummy = self.dummy_hash().await?;
            let _ = self.verify_password(password, dummy).await;
            debug!("Login for unknown email");
            return Err(SessionError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(SessionError::InvalidCredentials);
        }

        let pair = self.issuer.issue_pair(user.id)?;
        if !self.store.add_refresh_token(user.id, &pair.refresh_token).await? {
            debug!(user_id = %user.id, "User deleted during login");
            return Err(SessionError::InvalidCredentials);
        }

        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair, consuming the old token
    ///
    /// # Errors
    ///
    /// - `InvalidRefreshToken`: bad signature, expired, or unparseable
    /// - `UserNotFound`: the token's user is gone
    /// - `RefreshTokenRevoked`: the token was already rotated or logged out,
    ///   including when a concurrent refresh with the same token won
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let user_id = self
            .issuer
            .validate(refresh_token, TokenClass::Refresh)
            .map_err(|e| {
                debug!(error = %e, "Refresh token rejected");
                SessionError::InvalidRefreshToken
            })?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(SessionError::UserNotFound)?;

        if !user.has_refresh_token(refresh_token) {
            warn!(user_id = %user_id, "Refresh token reuse detected");
            return Err(SessionError::RefreshTokenRevoked);
        }

        let pair = self.issuer.issue_pair(user_id)?;
        match self
            .store
            .rotate_refresh_token(user_id, refresh_token, &pair.refresh_token)
            .await?
        {
            Rotation::Rotated => {
                info!(user_id = %user_id, "Session refreshed");
                Ok(pair)
            }
            Rotation::Revoked => {
                warn!(user_id = %user_id, "Refresh token consumed by a concurrent request");
                Err(SessionError::RefreshTokenRevoked)
            }
            Rotation::UserNotFound => Err(SessionError::UserNotFound),
        }
    }

    /// Revokes one refresh token of a user
    ///
    /// Removing a token that is not in the set, or for a user that does not
    /// exist, succeeds without doing anything.
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<(), SessionError> {
        if self.store.remove_refresh_token(user_id, refresh_token).await? {
            info!(user_id = %user_id, "User logged out");
        } else {
            debug!(user_id = %user_id, "Logout with unknown refresh token");
        }

        Ok(())
    }

    /// Resolves an access token to the ID of an existing user
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccessToken` if the token does not verify and
    /// `UserNotFound` if its user is gone
    pub async fn authenticate(&self, access_token: &str) -> Result<Uuid, SessionError> {
        let user_id = self
            .issuer
            .validate(access_token, TokenClass::Access)
            .map_err(|_| SessionError::InvalidAccessToken)?;

        if !self.store.user_exists(user_id).await? {
            return Err(SessionError::UserNotFound);
        }

        Ok(user_id)
    }

    async fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let hasher = self.hasher;
        let password = password.to_string();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))??;

        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, SessionError> {
        let hasher = self.hasher;
        let password = password.to_string();
        let hash = hash.to_string();

        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))??;

        Ok(matches)
    }

    async fn dummy_hash(&self) -> Result<&str, SessionError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD))
            .await?;

        Ok(hash.as_str())
    }
}

/// JWT token issuance and validation
///
/// Two independent token classes are signed with HS256 (HMAC-SHA256):
///
/// - **Access Token**: short-lived, presented as a bearer credential
/// - **Refresh Token**: long-lived, exchanged for a new pair and rotated on use
///
/// Both classes carry the same claim shape. They are kept apart only by their
/// signing secrets, so a token of one class fails signature verification
/// against the other class's key.
///
/// # Example
///
/// ```
/// use authgate_shared::auth::jwt::{TokenClass, TokenConfig, TokenIssuer};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = TokenIssuer::new(TokenConfig::new(
///     "access-secret-at-least-32-bytes-long!!",
///     "refresh-secret-at-least-32-bytes-long!",
/// ));
///
/// let user_id = Uuid::new_v4();
/// let pair = issuer.issue_pair(user_id)?;
///
/// assert_eq!(issuer.validate(&pair.access_token, TokenClass::Access)?, user_id);
/// assert!(issuer.validate(&pair.access_token, TokenClass::Refresh).is_err());
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// TTL applied when the configured value is empty
pub const DEFAULT_TTL_MINUTES: i64 = 15;

/// Longest TTL [`parse_ttl`] accepts (100 years)
pub const MAX_TTL_DAYS: i64 = 36_500;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature does not match the key of the requested class
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token cannot be parsed
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// TTL string cannot be parsed
    #[error("Invalid token TTL '{0}'")]
    InvalidTtl(String),
}

/// Token class identifier
///
/// Selects the secret (and default TTL) used to sign or verify a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived, rotating)
    Refresh,
}

/// JWT claims structure
///
/// # Claims
///
/// - `userId`: Subject user ID
/// - `iat`: Issued at (Unix timestamp, seconds)
/// - `exp`: Expiration (Unix timestamp, seconds)
/// - `jti`: Random token ID, keeps tokens issued within the same second distinct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    #[serde(rename = "userId")]
    pub user_id: Uuid,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token ID
    pub jti: Uuid,
}

impl Claims {
    /// Creates claims that expire `ttl` from now
    ///
    /// # Errors
    ///
    /// Returns `TokenError::CreateError` if the expiry is not a representable
    /// timestamp
    pub fn new(user_id: Uuid, ttl: Duration) -> Result<Self, TokenError> {
        let now = Utc::now();
        let exp = now.checked_add_signed(ttl).ok_or_else(|| {
            TokenError::CreateError(format!("TTL of {}s overflows the expiry", ttl.num_seconds()))
        })?;

        Ok(Self {
            user_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        })
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access and refresh token pair returned by every issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived bearer token
    pub access_token: String,

    /// Long-lived rotating token
    pub refresh_token: String,
}

/// Secrets and lifetimes for both token classes
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret used for access tokens
    pub access_secret: String,

    /// Secret used for refresh tokens (must differ from the access secret)
    pub refresh_secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Creates a config with the default lifetimes (15 minutes / 7 days)
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Overrides both lifetimes
    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }
}

struct KeyMaterial {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyMaterial {
    fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Signs and validates access and refresh tokens
pub struct TokenIssuer {
    access: KeyMaterial,
    refresh: KeyMaterial,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer from secrets and lifetimes
    pub fn new(config: TokenConfig) -> Self {
        Self {
            access: KeyMaterial::from_secret(&config.access_secret, config.access_ttl),
            refresh: KeyMaterial::from_secret(&config.refresh_secret, config.refresh_ttl),
        }
    }

    fn keys(&self, class: TokenClass) -> &KeyMaterial {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// Configured lifetime of a token class
    pub fn ttl(&self, class: TokenClass) -> Duration {
        self.keys(class).ttl
    }

    /// Issues a token of `class` for `user_id` that expires `ttl` from now
    ///
    /// # Errors
    ///
    /// Returns `TokenError::CreateError` if the expiry overflows or encoding fails
    pub fn issue(&self, user_id: Uuid, class: TokenClass, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, ttl)?;

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys(class).encoding)
            .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
    }

    /// Issues an access and a refresh token with their configured lifetimes
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user_id, TokenClass::Access, self.access.ttl)?,
            refresh_token: self.issue(user_id, TokenClass::Refresh, self.refresh.ttl)?,
        })
    }

    /// Verifies a token against the key of `class` and returns its claims
    ///
    /// The signature is checked before expiry, so a forged token is always
    /// reported as `InvalidSignature` and a genuine stale one as `Expired`.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if the token was not signed with the key of `class`
    /// - `Expired` if `now >= exp`
    /// - `Malformed` if the token cannot be parsed
    pub fn decode(&self, token: &str, class: TokenClass) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let token_data = decode::<Claims>(token, &self.keys(class).decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if token_data.claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(token_data.claims)
    }

    /// Validates a token of `class` and returns the user ID it was issued to
    pub fn validate(&self, token: &str, class: TokenClass) -> Result<Uuid, TokenError> {
        self.decode(token, class).map(|claims| claims.user_id)
    }
}

/// Parses a TTL string such as `30s`, `15m`, `12h` or `7d`
///
/// - Empty input defaults to 15 minutes
/// - An unrecognized suffix is treated as a raw millisecond count
///   (`"900000"` is 900000 ms, `"10x"` is 10 ms)
///
/// Use [`ttl_uses_raw_millis`] to detect the fallback.
///
/// # Errors
///
/// Returns `TokenError::InvalidTtl` if no number can be read, or if the
/// result is negative or longer than [`MAX_TTL_DAYS`]
///
/// # Example
///
/// ```
/// use authgate_shared::auth::jwt::parse_ttl;
/// use chrono::Duration;
///
/// assert_eq!(parse_ttl("15m").unwrap(), Duration::minutes(15));
/// assert_eq!(parse_ttl("7d").unwrap(), Duration::days(7));
/// assert_eq!(parse_ttl("").unwrap(), Duration::minutes(15));
/// ```
pub fn parse_ttl(value: &str) -> Result<Duration, TokenError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Duration::minutes(DEFAULT_TTL_MINUTES));
    }

    let invalid = || TokenError::InvalidTtl(value.to_string());

    let duration = if value.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = value.parse().map_err(|_| invalid())?;
        Duration::try_milliseconds(millis)
    } else {
        let unit = value.chars().last().ok_or_else(invalid)?;
        let amount: i64 = value[..value.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;

        match unit {
            's' => Duration::try_seconds(amount),
            'm' => Duration::try_minutes(amount),
            'h' => Duration::try_hours(amount),
            'd' => Duration::try_days(amount),
            _ => Duration::try_milliseconds(amount),
        }
    };

    duration
        .filter(|ttl| *ttl >= Duration::zero() && *ttl <= Duration::days(MAX_TTL_DAYS))
        .ok_or_else(invalid)
}

/// Whether [`parse_ttl`] would fall back to a raw millisecond count for `value`
pub fn ttl_uses_raw_millis(value: &str) -> bool {
    match value.trim().chars().last() {
        Some(unit) => !matches!(unit, 's' | 'm' | 'h' | 'd'),
        None => false,
    }
}

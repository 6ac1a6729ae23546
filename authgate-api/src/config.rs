/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present) and validated before anything starts.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `DATABASE_URL`: PostgreSQL connection string (unset: in-memory store)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `ACCESS_TOKEN_SECRET` / `REFRESH_TOKEN_SECRET`: Signing secrets (required, distinct, 32+ bytes)
/// - `ACCESS_TOKEN_EXPIRY` / `REFRESH_TOKEN_EXPIRY`: Token lifetimes (default: 15m / 7d)
/// - `FRONTEND_URL`: Primary browser origin (default: http://localhost:3000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any
/// - `COOKIE_SECURE`: Mark the refresh cookie `Secure` (default: false)
/// - `REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
/// - `PASSWORD_MEMORY_KIB` / `PASSWORD_ITERATIONS` / `PASSWORD_PARALLELISM`: Argon2 cost
///
/// # Example
///
/// ```no_run
/// use authgate_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::{collections::HashMap, env, fmt, str::FromStr};

use authgate_shared::auth::{
    jwt::{parse_ttl, ttl_uses_raw_millis, TokenConfig},
    password::PasswordParams,
};
use chrono::Duration;
use tracing::warn;

/// Minimum length of each signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Password hashing cost
    pub password: PasswordParams,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Whether the refresh cookie carries the `Secure` attribute
    pub cookie_secure: bool,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; `None` selects the in-memory store
    pub url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret for access tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    pub access_secret: String,

    /// Secret for refresh tokens, distinct from the access secret
    pub refresh_secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime, also the refresh cookie's Max-Age
    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A signing secret is missing, shorter than 32 bytes, or both are equal
    /// - A TTL cannot be parsed, or the access TTL is not shorter than the refresh TTL
    /// - A numeric variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&var, "API_PORT", 8080u16)?;

        let frontend_url =
            var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let cors_origins = match var("CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            None => vec![
                frontend_url,
                "http://localhost:5173".to_string(),
                "http://localhost:4200".to_string(),
            ],
        };

        let cookie_secure = match var("COOKIE_SECURE") {
            Some(value) => parse_flag(&value)
                .ok_or_else(|| anyhow::anyhow!("COOKIE_SECURE must be true or false, got '{}'", value))?,
            None => false,
        };

        let request_timeout_secs = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30u64)?;
        if request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        let database = DatabaseConfig {
            url: var("DATABASE_URL"),
            max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10u32)?,
        };

        let access_secret = var("ACCESS_TOKEN_SECRET")
            .ok_or_else(|| anyhow::anyhow!("ACCESS_TOKEN_SECRET environment variable is required"))?;
        let refresh_secret = var("REFRESH_TOKEN_SECRET")
            .ok_or_else(|| anyhow::anyhow!("REFRESH_TOKEN_SECRET environment variable is required"))?;

        if access_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("ACCESS_TOKEN_SECRET must be at least {} bytes long", MIN_SECRET_LEN);
        }
        if refresh_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("REFRESH_TOKEN_SECRET must be at least {} bytes long", MIN_SECRET_LEN);
        }
        if access_secret == refresh_secret {
            anyhow::bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
        }

        let access_ttl = ttl_from(&var, "ACCESS_TOKEN_EXPIRY", "15m")?;
        let refresh_ttl = ttl_from(&var, "REFRESH_TOKEN_EXPIRY", "7d")?;

        if access_ttl <= Duration::zero() {
            anyhow::bail!("ACCESS_TOKEN_EXPIRY must be positive");
        }
        if access_ttl >= refresh_ttl {
            anyhow::bail!(
                "ACCESS_TOKEN_EXPIRY ({}s) must be shorter than REFRESH_TOKEN_EXPIRY ({}s)",
                access_ttl.num_seconds(),
                refresh_ttl.num_seconds()
            );
        }

        let defaults = PasswordParams::default();
        let password = PasswordParams {
            memory_kib: parse_or(&var, "PASSWORD_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&var, "PASSWORD_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&var, "PASSWORD_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                cookie_secure,
                request_timeout_secs,
            },
            database,
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
                access_ttl,
                refresh_ttl,
            },
            password,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token issuer settings
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(&self.jwt.access_secret, &self.jwt.refresh_secret)
            .with_ttls(self.jwt.access_ttl, self.jwt.refresh_ttl)
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", key, value, e)),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn ttl_from<F>(var: &F, key: &str, default: &str) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());

    if ttl_uses_raw_millis(&raw) {
        warn!(
            variable = key,
            value = %raw,
            "Token expiry has no s/m/h/d unit; reading it as milliseconds"
        );
    }

    parse_ttl(&raw).map_err(|e| anyhow::anyhow!("{}: {}", key, e))
}

/// Variable source backed by a map, for tests
pub fn lookup_from(vars: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
    move |key| vars.get(key).cloned()
}

/// Database connection pool
///
/// The pool is verified with a round trip before it is handed out, so a bad
/// `DATABASE_URL` fails at startup rather than on the first login.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Connections kept open while idle
    pub min_connections: u32,

    /// How long a request waits for a free connection (seconds)
    pub acquire_timeout_seconds: u64,

    /// Idle connections are closed after this long (seconds)
    pub idle_timeout_seconds: Option<u64>,
}

impl DatabaseConfig {
    /// Default settings for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Overrides the pool size
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self.min_connections = self.min_connections.min(max_connections);
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 10,
            idle_timeout_seconds: Some(600),
        }
    }
}

/// Opens a pool and checks that the database answers
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database is unreachable
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

    if let Some(idle) = config.idle_timeout_seconds {
        options = options.idle_timeout(Duration::from_secs(idle));
    }

    let pool = options.connect(&config.url).await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    debug!("Database answered health check");

    info!("Database connection pool ready");
    Ok(pool)
}

/// Closes every pooled connection
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
}

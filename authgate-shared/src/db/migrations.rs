/// Schema migrations
///
/// SQL files under `authgate-shared/migrations/` are embedded at compile time
/// and applied in version order. Already-applied versions are skipped.

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{info, warn};

/// Applies all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails; that migration is rolled back
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Creates the database named in `database_url` if it is missing
///
/// Used by the database-backed test suites.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Creating database");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

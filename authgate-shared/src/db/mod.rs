/// PostgreSQL plumbing for [`crate::store::postgres::PgStore`]
///
/// - `pool`: connection pool construction and shutdown
/// - `migrations`: embedded schema migrations
///
/// # Example
///
/// ```no_run
/// use authgate_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;

//! # AuthGate API Server
//!
//! Serves the session endpoints and per-user items.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p authgate-api
//! ```
//!
//! Without `DATABASE_URL` the server runs on the in-memory store.

use std::sync::Arc;

use authgate_api::{
    app::{build_router, AppState},
    config::Config,
};
use authgate_shared::{
    db::{
        migrations::run_migrations,
        pool::{self, close_pool, create_pool},
    },
    store::{memory::MemoryStore, postgres::PgStore},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the log filter is read
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "authgate_api=debug,authgate_shared=info,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!(
        "AuthGate API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let bind_address = config.bind_address();

    let (state, db_pool) = match config.database.url.clone() {
        Some(url) => {
            let db_pool = create_pool(
                pool::DatabaseConfig::new(url)
                    .with_max_connections(config.database.max_connections),
            )
            .await?;
            run_migrations(&db_pool).await?;

            let store = Arc::new(PgStore::new(db_pool.clone()));
            (AppState::new(config, store, "postgres"), Some(db_pool))
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (AppState::new(config, store, "memory"), None)
        }
    };

    state.sessions.warm_up().await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db_pool) = db_pool {
        close_pool(db_pool).await;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!("Shutdown signal received, draining connections...");
}

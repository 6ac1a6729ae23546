/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use authgate_api::{app::{build_router, AppState}, config::Config};
/// use authgate_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(config, Arc::new(MemoryStore::new()), "memory");
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use std::{sync::Arc, time::Duration};

use authgate_shared::{
    auth::{
        jwt::TokenIssuer,
        middleware::{authenticate, Authenticator},
        password::PasswordHasher,
        session::SessionService,
    },
    store::{CredentialStore, ItemStore},
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, routes};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle service
    pub sessions: Arc<SessionService>,

    /// Per-user items
    pub items: Arc<dyn ItemStore>,

    /// Credential store, for health checks
    pub credentials: Arc<dyn CredentialStore>,

    /// Store backend name reported by `/health`
    pub store_kind: &'static str,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the session service and routes to one store backend
    pub fn new<S>(config: Config, store: Arc<S>, store_kind: &'static str) -> Self
    where
        S: CredentialStore + ItemStore + 'static,
    {
        let issuer = Arc::new(TokenIssuer::new(config.token_config()));
        let hasher = PasswordHasher::new(config.password);
        let sessions = Arc::new(SessionService::new(store.clone(), issuer, hasher));

        Self {
            sessions,
            items: store.clone(),
            credentials: store,
            store_kind,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /refresh     (refresh cookie)
///     │   └── POST /logout      (bearer + refresh cookie)
///     └── /items/               (bearer required)
///         ├── GET    /
///         ├── POST   /
///         └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. CORS (tower-http CorsLayer)
/// 2. Logging (tower-http TraceLayer)
/// 3. Request timeout (tower-http TimeoutLayer)
/// 4. Bearer authentication, which only attaches a `Principal`
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let item_routes = Router::new()
        .route(
            "/",
            get(routes::items::list_items).post(routes::items::create_item),
        )
        .route("/:id", delete(routes::items::delete_item));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/items", item_routes);

    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    let authenticator = Authenticator::new(state.sessions.clone());
    let timeout = Duration::from_secs(state.config.api.request_timeout_secs);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(authenticator, authenticate))
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

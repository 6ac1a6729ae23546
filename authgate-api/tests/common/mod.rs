#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// The router runs against the in-memory store with a cheap argon2 cost, so
/// no external services are needed.

use std::{collections::HashMap, sync::Arc};

use authgate_api::app::{build_router, AppState};
use authgate_api::config::{lookup_from, Config};
use authgate_shared::store::{memory::MemoryStore, CredentialStore, ItemStore};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "Abcdef1!";

/// Test context holding the router and its store
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

/// Status, headers and JSON body of a response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Raw `Set-Cookie` header for the refresh cookie
    pub fn refresh_set_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("jid="))
            .map(str::to_string)
    }

    /// Value of the refresh cookie set by this response
    pub fn refresh_cookie(&self) -> Option<String> {
        let set_cookie = self.refresh_set_cookie()?;
        let pair = set_cookie.split(';').next()?;
        pair.strip_prefix("jid=").map(str::to_string)
    }

    pub fn access_token(&self) -> String {
        self.body["accessToken"]
            .as_str()
            .expect("response has no accessToken")
            .to_string()
    }
}

/// Tokens of an open session
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Builds the app with extra environment overrides
    pub fn with_vars(extra: &[(&str, &str)]) -> Self {
        Self::build(extra, |store| store)
    }

    /// Builds the app over a store that wraps the in-memory one
    ///
    /// `store` on the returned context is the wrapped in-memory store.
    pub fn wrapping<S, F>(wrap: F) -> Self
    where
        S: CredentialStore + ItemStore + 'static,
        F: FnOnce(Arc<MemoryStore>) -> Arc<S>,
    {
        Self::build(&[], wrap)
    }

    fn build<S, F>(extra: &[(&str, &str)], wrap: F) -> Self
    where
        S: CredentialStore + ItemStore + 'static,
        F: FnOnce(Arc<MemoryStore>) -> Arc<S>,
    {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert(
            "ACCESS_TOKEN_SECRET".into(),
            "integration-access-secret-0123456789".into(),
        );
        vars.insert(
            "REFRESH_TOKEN_SECRET".into(),
            "integration-refresh-secret-0123456789".into(),
        );
        vars.insert("PASSWORD_MEMORY_KIB".into(), "1024".into());
        vars.insert("PASSWORD_ITERATIONS".into(), "1".into());
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(lookup_from(&vars)).expect("test config");
        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(config.clone(), wrap(store.clone()), "memory"));

        Self { app, store, config }
    }

    /// Sends a request through a fresh clone of the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/auth/register",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Registers a user and returns its session tokens
    pub async fn session(&self, email: &str) -> Session {
        let response = self.register(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);

        Session {
            access_token: response.access_token(),
            refresh_token: response.refresh_cookie().expect("refresh cookie"),
        }
    }

    pub async fn refresh(&self, refresh_token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh");
        if let Some(token) = refresh_token {
            builder = builder.header(header::COOKIE, format!("jid={}", token));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout");
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(token) = refresh_token {
            builder = builder.header(header::COOKIE, format!("jid={}", token));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Sends an items request with an optional bearer token
    pub async fn items(
        &self,
        method: Method,
        uri: &str,
        access_token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }
}

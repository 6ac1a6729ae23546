/// Bearer authentication for Axum
///
/// [`authenticate`] runs in front of every route. It only annotates: a valid
/// `Authorization: Bearer <access token>` for an existing user adds a
/// [`Principal`] to the request extensions, and anything else leaves the
/// request anonymous. It never rejects.
///
/// Routes decide for themselves. A handler that takes [`Principal`] answers
/// anonymous requests with 401; one that takes `Option<Principal>` serves both.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use authgate_shared::auth::middleware::{authenticate, Authenticator, Principal};
/// use authgate_shared::auth::session::SessionService;
///
/// async fn me(principal: Principal) -> String {
///     principal.user_id.to_string()
/// }
///
/// fn router(sessions: Arc<SessionService>) -> Router {
///     Router::new()
///         .route("/me", get(me))
///         .layer(middleware::from_fn_with_state(Authenticator::new(sessions), authenticate))
/// }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::session::{SessionError, SessionService};

/// Authenticated caller, attached to the request by [`authenticate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

/// Middleware state
#[derive(Clone)]
pub struct Authenticator {
    sessions: Arc<SessionService>,
}

impl Authenticator {
    pub fn new(sessions: Arc<SessionService>) -> Self {
        Self { sessions }
    }
}

/// Rejection for handlers that require a [`Principal`]
#[derive(Debug, Clone, Copy)]
pub struct Unauthenticated;

impl IntoResponse for Unauthenticated {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "unauthorized",
                "message": "Authentication required",
            })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Unauthenticated;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or(Unauthenticated)
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Attaches a [`Principal`] when the request carries a valid access token
///
/// Install with `axum::middleware::from_fn_with_state`.
pub async fn authenticate(
    State(auth): State<Authenticator>,
    mut req: Request,
    next: Next,
) -> Response {
    // Only this middleware may set the principal
    req.extensions_mut().remove::<Principal>();

    let resolved = match bearer_token(&req) {
        Some(token) => auth.sessions.authenticate(token).await,
        None => return next.run(req).await,
    };

    match resolved {
        Ok(user_id) => {
            req.extensions_mut().insert(Principal { user_id });
        }
        Err(SessionError::Store(e)) => {
            warn!(error = %e, "Store unavailable during authentication");
        }
        Err(e) => {
            debug!(reason = %e, "Bearer token not accepted");
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenClass, TokenConfig, TokenIssuer};
    use crate::auth::password::{PasswordHasher, PasswordParams};
    use crate::store::memory::MemoryStore;
    use axum::{body::Body, middleware, routing::get, Router};
    use chrono::Duration;
    use tower::ServiceExt;

    async fn whoami(principal: Option<Principal>) -> String {
        principal
            .map(|p| p.user_id.to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    async fn protected(principal: Principal) -> String {
        principal.user_id.to_string()
    }

    fn app() -> (Router, Arc<SessionService>) {
        let sessions = Arc::new(SessionService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(TokenIssuer::new(TokenConfig::new(
                "test-access-secret-0123456789abcdef",
                "test-refresh-secret-0123456789abcdef",
            ))),
            PasswordHasher::new(PasswordParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            }),
        ));

        let router = Router::new()
            .route("/whoami", get(whoami))
            .route("/protected", get(protected))
            .layer(middleware::from_fn_with_state(
                Authenticator::new(sessions.clone()),
                authenticate,
            ));

        (router, sessions)
    }

    async fn call(router: Router, path: &str, authorization: Option<String>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let response = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_token_attaches_principal() {
        let (router, sessions) = app();
        let pair = sessions.register("a@x.com", "Passw0rd!").await.unwrap();
        let user_id = sessions
            .issuer()
            .validate(&pair.access_token, TokenClass::Access)
            .unwrap();

        let (status, body) = call(
            router,
            "/whoami",
            Some(format!("Bearer {}", pair.access_token)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user_id.to_string());
    }

    #[tokio::test]
    async fn test_bad_credentials_stay_anonymous() {
        let (router, sessions) = app();
        let pair = sessions.register("a@x.com", "Passw0rd!").await.unwrap();
        let user_id = sessions
            .issuer()
            .validate(&pair.access_token, TokenClass::Access)
            .unwrap();
        let expired = sessions
            .issuer()
            .issue(user_id, TokenClass::Access, Duration::seconds(-1))
            .unwrap();
        let orphan = sessions
            .issuer()
            .issue(Uuid::new_v4(), TokenClass::Access, Duration::minutes(5))
            .unwrap();

        let cases = vec![
            None,
            Some("Bearer".to_string()),
            Some("Bearer garbage".to_string()),
            Some(format!("Basic {}", pair.access_token)),
            Some(format!("Bearer {}", pair.refresh_token)),
            Some(format!("Bearer {}", expired)),
            Some(format!("Bearer {}", orphan)),
        ];

        for authorization in cases {
            let (status, body) = call(router.clone(), "/whoami", authorization.clone()).await;
            assert_eq!(status, StatusCode::OK, "{:?}", authorization);
            assert_eq!(body, "anonymous", "{:?}", authorization);
        }
    }

    #[tokio::test]
    async fn test_required_principal_rejects_anonymous() {
        let (router, _) = app();

        let (status, body) = call(router, "/protected", Some("Bearer garbage".to_string())).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "unauthorized");
        assert_eq!(json["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_forged_principal_is_discarded() {
        let (router, _) = app();

        let mut req = Request::builder()
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(Principal {
            user_id: Uuid::new_v4(),
        });

        let response = router.oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(&body[..], b"anonymous");
    }
}

/// Integration tests for the session endpoints
///
/// - Registration, login and their validation
/// - Refresh cookie attributes and rotation
/// - Reuse of consumed tokens and logout revocation

mod common;

use std::sync::Arc;

use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use common::{TestContext, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_register_returns_access_token_and_cookie() {
    let ctx = TestContext::new();

    let response = ctx.register("a@x.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.access_token().is_empty());
    assert!(response.body.get("refreshToken").is_none());

    let cookie = response.refresh_set_cookie().expect("jid cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/api/auth"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_secure_cookie_when_configured() {
    let ctx = TestContext::with_vars(&[("COOKIE_SECURE", "true")]);

    let response = ctx.register("a@x.com", PASSWORD).await;

    assert!(response.refresh_set_cookie().unwrap().contains("Secure"));
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let bad_email = ctx.register("not-an-email", PASSWORD).await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.body["error"], "validation_error");
    assert_eq!(bad_email.body["details"][0]["field"], "email");

    for weak in ["Ab1!", "abcdef1!", "ABCDEF1!", "Abcdefg!", "Abcdefg1"] {
        let response = ctx.register("a@x.com", weak).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", weak);
        assert_eq!(response.body["details"][0]["field"], "password");
    }

    // Nothing was stored
    assert_eq!(ctx.register("a@x.com", PASSWORD).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new();
    ctx.register("a@x.com", PASSWORD).await;

    let response = ctx.register("a@x.com", "0therPass!").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "user_exists");
}

#[tokio::test]
async fn test_login() {
    let ctx = TestContext::new();
    let session = ctx.session("a@x.com").await;

    let response = ctx.login("a@x.com", PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    let refresh = response.refresh_cookie().unwrap();
    assert_ne!(refresh, session.refresh_token);

    // Both sessions stay usable
    assert_eq!(ctx.refresh(Some(&session.refresh_token)).await.status, StatusCode::OK);
    assert_eq!(ctx.refresh(Some(&refresh)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let ctx = TestContext::new();
    ctx.session("a@x.com").await;

    let wrong_password = ctx.login("a@x.com", "Wr0ngPass!").await;
    let unknown_email = ctx.login("b@x.com", PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.body["error"], "invalid_credentials");
    assert!(wrong_password.refresh_set_cookie().is_none());
}

#[tokio::test]
async fn test_refresh_rotates_cookie() {
    let ctx = TestContext::new();
    let session = ctx.session("a@x.com").await;

    let response = ctx.refresh(Some(&session.refresh_token)).await;

    assert_eq!(response.status, StatusCode::OK);
    let rotated = response.refresh_cookie().unwrap();
    assert_ne!(rotated, session.refresh_token);
    assert_ne!(response.access_token(), session.access_token);

    let reuse = ctx.refresh(Some(&session.refresh_token)).await;
    assert_eq!(reuse.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reuse.body["error"], "refresh_token_revoked");

    // The rotated token is unaffected by the failed reuse
    assert_eq!(ctx.refresh(Some(&rotated)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejections() {
    let ctx = TestContext::new();
    let session = ctx.session("a@x.com").await;

    let missing = ctx.refresh(None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "missing_refresh_token");

    let garbage = ctx.refresh(Some("garbage")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["error"], "invalid_refresh_token");

    let access_as_refresh = ctx.refresh(Some(&session.access_token)).await;
    assert_eq!(access_as_refresh.status, StatusCode::UNAUTHORIZED);
    assert_eq!(access_as_refresh.body["error"], "invalid_refresh_token");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_single_winner() {
    let ctx = Arc::new(TestContext::new());
    let session = ctx.session("a@x.com").await;

    let attempts = (0..6).map(|_| {
        let ctx = ctx.clone();
        let token = session.refresh_token.clone();
        tokio::spawn(async move { ctx.refresh(Some(&token)).await })
    });
    let responses: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let ok = responses
        .iter()
        .filter(|r| r.status == StatusCode::OK)
        .count();
    assert_eq!(ok, 1);
    assert!(responses
        .iter()
        .filter(|r| r.status != StatusCode::OK)
        .all(|r| r.body["error"] == "refresh_token_revoked"));
}

#[tokio::test]
async fn test_full_session_scenario() {
    let ctx = TestContext::new();

    let first = ctx.session("a@x.com").await;
    let second = ctx.refresh(Some(&first.refresh_token)).await;
    let r2 = second.refresh_cookie().unwrap();
    let a2 = second.access_token();

    assert_eq!(
        ctx.refresh(Some(&first.refresh_token)).await.body["error"],
        "refresh_token_revoked"
    );

    let logout = ctx.logout(Some(&a2), Some(&r2)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body, json!({ "message": "Logged out" }));
    let cleared = logout.refresh_set_cookie().unwrap();
    assert!(cleared.contains("Max-Age=0"));
    assert!(cleared.contains("Path=/api/auth"));

    let after = ctx.refresh(Some(&r2)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["error"], "refresh_token_revoked");
}

#[tokio::test]
async fn test_logout_only_revokes_presented_token() {
    let ctx = TestContext::new();
    let first = ctx.session("a@x.com").await;
    let second = ctx.login("a@x.com", PASSWORD).await.refresh_cookie().unwrap();

    ctx.logout(Some(&first.access_token), Some(&first.refresh_token)).await;

    assert_eq!(ctx.refresh(Some(&first.refresh_token)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.refresh(Some(&second)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_without_credentials_is_noop() {
    let ctx = TestContext::new();
    let session = ctx.session("a@x.com").await;

    let anonymous = ctx.logout(None, Some(&session.refresh_token)).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    assert_eq!(anonymous.body["message"], "Logged out");

    let no_cookie = ctx.logout(Some(&session.access_token), None).await;
    assert_eq!(no_cookie.status, StatusCode::OK);

    // No principal means nothing was revoked
    assert_eq!(ctx.refresh(Some(&session.refresh_token)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_origin() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/auth/login")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let response = ctx
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["store"], "memory");
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
}

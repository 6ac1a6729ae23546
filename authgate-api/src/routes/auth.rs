/// Session endpoints
///
/// The access token travels in the JSON body and is presented back as a
/// bearer token. The refresh token never appears in a body: it lives in the
/// `jid` cookie, which is HttpOnly, SameSite=Lax and scoped to `/api/auth`,
/// so only these endpoints ever receive it.
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register and open a session
/// - `POST /api/auth/login` - Open a session
/// - `POST /api/auth/refresh` - Rotate the refresh cookie and get a new access token
/// - `POST /api/auth/logout` - Revoke the refresh cookie

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use authgate_shared::auth::{
    jwt::{TokenClass, TokenPair},
    middleware::Principal,
    password::validate_password_strength,
};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Refresh cookie name
pub const REFRESH_COOKIE: &str = "jid";

/// Path the refresh cookie is scoped to
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Body of every session-opening response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    /// Short-lived bearer token
    pub access_token: String,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Stores the refresh token in the cookie jar and returns the access token body
fn session_response(
    state: &AppState,
    jar: CookieJar,
    pair: TokenPair,
) -> (CookieJar, Json<AccessTokenResponse>) {
    let max_age = state.sessions.issuer().ttl(TokenClass::Refresh);

    let cookie = Cookie::build((REFRESH_COOKIE, pair.refresh_token))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(state.config.api.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build();

    (
        jar.add(cookie),
        Json(AccessTokenResponse {
            access_token: pair.access_token,
        }),
    )
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "accessToken": "eyJ..." }
/// ```
///
/// plus `Set-Cookie: jid=<refresh token>`.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Email already registered (`user_exists`)
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(CookieJar, Json<AccessTokenResponse>)> {
    req.validate()?;
    validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let pair = state.sessions.register(&req.email, &req.password).await?;
    Ok(session_response(&state, jar, pair))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password (`invalid_credentials`)
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AccessTokenResponse>)> {
    req.validate()?;

    let pair = state.sessions.login(&req.email, &req.password).await?;
    Ok(session_response(&state, jar, pair))
}

/// Refresh endpoint
///
/// Consumes the refresh token in the `jid` cookie and replaces it.
///
/// # Errors
///
/// - `401 Unauthorized`: Cookie missing, or the token is invalid, expired,
///   already used or revoked
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<AccessTokenResponse>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::unauthorized("missing_refresh_token", "No token provided"))?;

    let pair = state.sessions.refresh(&token).await?;
    Ok(session_response(&state, jar, pair))
}

/// Logout endpoint
///
/// Revokes the refresh token in the `jid` cookie for the authenticated user
/// and expires the cookie. Without a principal or a cookie nothing is
/// revoked, and a token that is already gone is not an error; the response
/// is the same either way.
///
/// # Errors
///
/// - `500 Internal Server Error`: The store failed; the cookie is kept and
///   the token may still be valid
pub async fn logout(
    State(state): State<AppState>,
    principal: Option<Principal>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    if let (Some(principal), Some(cookie)) = (principal, jar.get(REFRESH_COOKIE)) {
        state
            .sessions
            .logout(principal.user_id, cookie.value())
            .await?;
    }

    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path(REFRESH_COOKIE_PATH));

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`. Session failures are
/// translated in one place ([`From<SessionError>`]): every client-facing kind
/// becomes a 401 with a stable snake_case code, and infrastructure failures
/// become a 500 whose details are logged but never returned.
///
/// # Example
///
/// ```
/// use authgate_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Item not found".to_string()));
///     }
///     Ok(Json(json!({ "message": "Deleted" })))
/// }
/// ```

use authgate_shared::{auth::session::SessionError, store::StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Authentication or session failure (401) with its error code
    Unauthorized {
        code: &'static str,
        message: String,
    },

    /// Not found (404)
    NotFound(String),

    /// Request validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

impl ApiError {
    /// 401 with the given error code
    pub fn unauthorized(code: &'static str, message: &str) -> Self {
        ApiError::Unauthorized {
            code,
            message: message.to_string(),
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "invalid_credentials", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { code, message } => {
                write!(f, "Unauthorized ({}): {}", code, message)
            }
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, code, message, None)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UserExists => ApiError::unauthorized("user_exists", "User already exists"),
            SessionError::InvalidCredentials => {
                ApiError::unauthorized("invalid_credentials", "Invalid credentials")
            }
            SessionError::UserNotFound => ApiError::unauthorized("user_not_found", "User not found"),
            SessionError::InvalidRefreshToken => {
                ApiError::unauthorized("invalid_refresh_token", "Invalid refresh token")
            }
            SessionError::RefreshTokenRevoked => {
                ApiError::unauthorized("refresh_token_revoked", "Refresh token revoked")
            }
            SessionError::InvalidAccessToken => {
                ApiError::unauthorized("invalid_access_token", "Invalid access token")
            }
            SessionError::Store(e) => e.into(),
            SessionError::Password(e) => {
                ApiError::InternalError(format!("Password operation failed: {}", e))
            }
            SessionError::TokenIssue(e) => {
                ApiError::InternalError(format!("Token issuance failed: {}", e))
            }
            SessionError::Worker(e) => ApiError::InternalError(format!("Blocking task failed: {}", e)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Store error: {}", err))
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use statuspage_core::error::CoreError;
use statuspage_core::events::EventError;
use statuspage_core::identity::AuthError;
use statuspage_core::templates::TemplateError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps each domain taxonomy and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses of
/// the shape `{"error": <message>, "code": <CODE>}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Generic boundary errors: validation, identity, role gates, subscriptions.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Authentication engine outcomes.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Event state machine and template outcomes.
    #[error(transparent)]
    Event(#[from] EventError),

    /// A malformed request the domain layers never see.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound(what) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{what} not found"))
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => internal(msg),
            },

            // --- AuthError variants ---
            AppError::Auth(auth) => match auth {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid email or password".to_string(),
                ),
                AuthError::EmailExists => (
                    StatusCode::CONFLICT,
                    "EMAIL_EXISTS",
                    "Email is already registered".to_string(),
                ),
                AuthError::InvalidToken => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "Invalid token".to_string(),
                ),
                AuthError::TokenExpired => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "Token has expired".to_string(),
                ),
                AuthError::UserNotFound => (
                    StatusCode::NOT_FOUND,
                    "USER_NOT_FOUND",
                    "User not found".to_string(),
                ),
                AuthError::Internal(msg) => internal(msg),
            },

            // --- EventError variants ---
            AppError::Event(event) => match event {
                EventError::EventNotFound => (
                    StatusCode::NOT_FOUND,
                    "EVENT_NOT_FOUND",
                    "Event not found".to_string(),
                ),
                EventError::TemplateNotFound => (
                    StatusCode::NOT_FOUND,
                    "TEMPLATE_NOT_FOUND",
                    "Template not found".to_string(),
                ),
                EventError::InvalidStatus => {
                    (StatusCode::BAD_REQUEST, "INVALID_STATUS", event.to_string())
                }
                EventError::InvalidSeverity => {
                    (StatusCode::BAD_REQUEST, "INVALID_SEVERITY", event.to_string())
                }
                EventError::InvalidEventType => {
                    (StatusCode::BAD_REQUEST, "INVALID_EVENT_TYPE", event.to_string())
                }
                EventError::InvalidTemplate(err @ TemplateError::Parse { .. }) => {
                    (StatusCode::BAD_REQUEST, "INVALID_TEMPLATE", err.to_string())
                }
                EventError::InvalidTemplate(err @ TemplateError::Render(_)) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "TEMPLATE_RENDER_FAILED",
                    err.to_string(),
                ),
                EventError::TemplateSlugExists(slug) => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Template slug {slug:?} already exists"),
                ),
                EventError::Internal(msg) => internal(msg),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Log the real cause and hand the caller a generic message.
fn internal(msg: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %msg, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

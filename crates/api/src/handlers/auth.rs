//! Handlers for the `/auth` resource and the caller's own profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use statuspage_core::identity::TokenPair;
use statuspage_db::models::user::UserResponse;
use validator::Validate;

use crate::auth::service::Registration;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh` and `POST /auth/logout`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful login: the user and a fresh token pair.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a `user`-role account. The response never includes the password hash.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    input.validate()?;

    let user = state
        .auth
        .register(Registration {
            email: input.email,
            password: input.password,
            first_name: input.first_name,
            last_name: input.last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: user.to_response(),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns the user and a token pair.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<LoginResponse>>> {
    let (user, tokens) = state.auth.login(&input.email, &input.password).await?;
    Ok(Json(DataResponse {
        data: LoginResponse {
            user: user.to_response(),
            tokens,
        },
    }))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. The old token stops working.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<DataResponse<TokenPair>>> {
    let tokens = state.auth.refresh_tokens(&input.refresh_token).await?;
    Ok(Json(DataResponse { data: tokens }))
}

/// POST /api/v1/auth/logout
///
/// Revoke one refresh token. Answers 204 whether or not the token existed.
pub async fn logout(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<StatusCode> {
    state.auth.logout(&input.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// Revoke every refresh token of the authenticated user.
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<StatusCode> {
    state.auth.logout_all(auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state.auth.get_user(auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: user.to_response(),
    }))
}

//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role ranks
//! below the minimum. A missing or invalid token is 401; a valid token with
//! an insufficient (or unrecognised) role is 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use statuspage_core::error::CoreError;
use statuspage_core::roles::{permits, Role};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require(parts: &mut Parts, state: &AppState, required: Role) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !permits(&user.role, required) {
        tracing::debug!(user_id = %user.user_id, role = %user.role, %required, "Role check failed");
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "{required} role required"
        ))));
    }
    Ok(user)
}

/// Requires `operator` or `admin`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn handler(RequireOperator(user): RequireOperator) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireOperator(pub AuthUser);

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Role::Operator).await.map(RequireOperator)
    }
}

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Role::Admin).await.map(RequireAdmin)
    }
}

//! Handlers for the caller's own subscription at `/me/subscriptions`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use statuspage_db::models::subscriber::Subscription;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::subscriptions::SubscribeRequest;
use crate::state::AppState;

/// GET /api/v1/me/subscriptions
pub async fn get(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Subscription>>> {
    let subscription = state.subscriptions.get(auth_user.user_id).await?;
    Ok(Json(DataResponse { data: subscription }))
}

/// POST /api/v1/me/subscriptions
///
/// Create or replace the caller's subscription. An empty `service_ids`
/// subscribes to every service.
pub async fn subscribe(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<SubscribeRequest>,
) -> AppResult<Json<DataResponse<Subscription>>> {
    let subscription = state
        .subscriptions
        .subscribe(auth_user.user_id, input)
        .await?;
    Ok(Json(DataResponse { data: subscription }))
}

/// DELETE /api/v1/me/subscriptions
pub async fn unsubscribe(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<StatusCode> {
    state.subscriptions.unsubscribe(auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

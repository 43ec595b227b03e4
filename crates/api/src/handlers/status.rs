//! Public status page handlers. No authentication.

use axum::extract::State;
use axum::Json;
use statuspage_db::models::event::Event;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::services::events::{STATUS_HISTORY_LIMIT, STATUS_RECENT_LIMIT};
use crate::state::AppState;

/// GET /api/v1/status
pub async fn current(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Event>>>> {
    let events = state.events.recent_events(STATUS_RECENT_LIMIT).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/status/history
pub async fn history(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Event>>>> {
    let events = state.events.recent_events(STATUS_HISTORY_LIMIT).await?;
    Ok(Json(DataResponse { data: events }))
}

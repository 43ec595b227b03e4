//! Handlers for the `/events` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use statuspage_core::types::DbId;
use statuspage_db::models::event::{Event, EventUpdate};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireAdmin, RequireOperator};
use crate::response::DataResponse;
use crate::services::events::{AddUpdateRequest, CreateEventRequest, ListEventsQuery};
use crate::state::AppState;

/// POST /api/v1/events
pub async fn create(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Json(input): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Event>>)> {
    input.validate()?;
    let event = state.events.create_event(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/events?type=&status=&limit=&offset=
pub async fn list(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Query(query): Query<ListEventsQuery>,
) -> AppResult<Json<DataResponse<Vec<Event>>>> {
    let events = state.events.list_events(query).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/events/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Event>>> {
    let event = state.events.get_event(id).await?;
    Ok(Json(DataResponse { data: event }))
}

/// DELETE /api/v1/events/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.events.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/events/{id}/updates
///
/// Append a status update. Returns the new history entry.
pub async fn add_update(
    State(state): State<AppState>,
    RequireOperator(user): RequireOperator,
    Path(id): Path<DbId>,
    Json(input): Json<AddUpdateRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<EventUpdate>>)> {
    input.validate()?;
    let (_event, update) = state.events.add_update(id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: update })))
}

/// GET /api/v1/events/{id}/updates
pub async fn list_updates(
    State(state): State<AppState>,
    RequireOperator(_user): RequireOperator,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EventUpdate>>>> {
    let updates = state.events.list_updates(id).await?;
    Ok(Json(DataResponse { data: updates }))
}

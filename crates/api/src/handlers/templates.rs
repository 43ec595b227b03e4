//! Handlers for the `/templates` resource. All require `admin`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use statuspage_core::templates::TemplateData;
use statuspage_core::types::DbId;
use statuspage_db::models::event_template::EventTemplate;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::services::events::{CreateTemplateRequest, RenderedTemplate, UpdateTemplateRequest};
use crate::state::AppState;

/// POST /api/v1/templates
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateTemplateRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<EventTemplate>>)> {
    input.validate()?;
    let template = state.events.create_template(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/templates
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<EventTemplate>>>> {
    let templates = state.events.list_templates().await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<EventTemplate>>> {
    let template = state.events.get_template_by_slug(&slug).await?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/templates/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
    Json(input): Json<UpdateTemplateRequest>,
) -> AppResult<Json<DataResponse<EventTemplate>>> {
    let id = parse_template_id(&key)?;
    input.validate()?;
    let template = state.events.update_template(id, input).await?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/templates/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_template_id(&key)?;
    state.events.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{slug}/preview
///
/// Render the template against the sample data in the body.
pub async fn preview(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(slug): Path<String>,
    Json(data): Json<TemplateData>,
) -> AppResult<Json<DataResponse<RenderedTemplate>>> {
    let rendered = state.events.preview_template(&slug, &data).await?;
    Ok(Json(DataResponse { data: rendered }))
}

/// `/{key}` carries a slug on reads and an id on writes; writes need the id.
fn parse_template_id(key: &str) -> AppResult<DbId> {
    key.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid template id: {key:?}")))
}

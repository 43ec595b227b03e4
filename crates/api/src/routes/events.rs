//! Route definitions for the `/events` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// GET    /                -> list
/// POST   /                -> create
/// GET    /{id}            -> get_by_id
/// DELETE /{id}            -> delete (admin)
/// GET    /{id}/updates    -> list_updates
/// POST   /{id}/updates    -> add_update
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list).post(events::create))
        .route("/{id}", get(events::get_by_id).delete(events::delete))
        .route(
            "/{id}/updates",
            get(events::list_updates).post(events::add_update),
        )
}

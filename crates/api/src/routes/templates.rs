//! Route definitions for the `/templates` resource.
//!
//! The single-segment path is shared: `GET` takes a slug, `PUT` and `DELETE`
//! take an id.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /                  -> list
/// POST   /                  -> create
/// GET    /{slug}            -> get_by_slug
/// PUT    /{id}              -> update
/// DELETE /{id}              -> delete
/// POST   /{slug}/preview    -> preview
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::list).post(templates::create))
        .route(
            "/{key}",
            get(templates::get_by_slug)
                .put(templates::update)
                .delete(templates::delete),
        )
        .route("/{key}/preview", post(templates::preview))
}

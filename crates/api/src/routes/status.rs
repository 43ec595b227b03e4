//! Route definitions for the public `/status` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::status;
use crate::state::AppState;

/// ```text
/// GET /          -> current
/// GET /history   -> history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status::current))
        .route("/history", get(status::history))
}

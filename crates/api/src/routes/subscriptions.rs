//! Route definitions for `/me/subscriptions`. Every route requires auth.

use axum::routing::get;
use axum::Router;

use crate::handlers::subscriptions;
use crate::state::AppState;

/// ```text
/// GET    /    -> get
/// POST   /    -> subscribe
/// DELETE /    -> unsubscribe
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(subscriptions::get)
            .post(subscriptions::subscribe)
            .delete(subscriptions::unsubscribe),
    )
}

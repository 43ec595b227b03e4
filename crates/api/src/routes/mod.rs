pub mod auth;
pub mod events;
pub mod health;
pub mod status;
pub mod subscriptions;
pub mod templates;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                     register (public)
/// /auth/login                        login (public)
/// /auth/refresh                      refresh (public)
/// /auth/logout                       revoke one refresh token (public)
/// /auth/logout-all                   revoke all of the caller's tokens (auth)
/// /me                                the caller's profile (auth)
/// /me/subscriptions                  get, replace, delete own subscription (auth)
///
/// /status                            recent events (public)
/// /status/history                    event history (public)
///
/// /events                            create, list (operator)
/// /events/{id}                       get (operator), delete (admin)
/// /events/{id}/updates               add, list (operator)
///
/// /templates                         create, list (admin)
/// /templates/{key}                   get by slug, update/delete by id (admin)
/// /templates/{slug}/preview          render against sample data (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .route("/me", get(handlers::auth::me))
        .nest("/me/subscriptions", subscriptions::router())
        .nest("/status", status::router())
        .nest("/events", events::router())
        .nest("/templates", templates::router())
}

//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource. Handlers
//! validate request shape, delegate to [`AuthService`](crate::auth::service::AuthService),
//! [`SubscriptionService`](crate::services::subscriptions::SubscriptionService)
//! or [`EventService`](crate::services::events::EventService), and map errors
//! via [`AppError`](crate::error::AppError).

pub mod auth;
pub mod events;
pub mod health;
pub mod status;
pub mod subscriptions;
pub mod templates;

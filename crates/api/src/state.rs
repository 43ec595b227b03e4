use std::sync::Arc;

use statuspage_db::StoreHealth;

use crate::auth::service::AuthService;
use crate::services::events::EventService;
use crate::services::subscriptions::SubscriptionService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Authentication engine. Also verifies bearer tokens for the extractors.
    pub auth: Arc<AuthService>,
    /// Event and template operations.
    pub events: Arc<EventService>,
    /// The caller's own notification subscription.
    pub subscriptions: Arc<SubscriptionService>,
    /// Readiness probe for the backing store.
    pub health: Arc<dyn StoreHealth>,
}

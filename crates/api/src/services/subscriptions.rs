//! A user's own service subscription, read by notification dispatch.

use std::sync::Arc;

use serde::Deserialize;
use statuspage_core::error::CoreError;
use statuspage_core::types::DbId;
use statuspage_db::models::subscriber::Subscription;
use statuspage_db::{StoreError, SubscriberStore};

/// Request body for `POST /me/subscriptions`. An empty or absent list
/// subscribes to every service.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub service_ids: Vec<DbId>,
}

pub struct SubscriptionService {
    store: Arc<dyn SubscriberStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriberStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: DbId) -> Result<Subscription, CoreError> {
        self.store
            .find_subscription(user_id)
            .await
            .map_err(|e| miss("loading subscription", e))
    }

    /// Create the subscription or replace its service list.
    pub async fn subscribe(
        &self,
        user_id: DbId,
        input: SubscribeRequest,
    ) -> Result<Subscription, CoreError> {
        let subscription = self
            .store
            .set_subscription(user_id, &input.service_ids)
            .await
            .map_err(|e| CoreError::Internal(format!("saving subscription: {e}")))?;

        tracing::info!(
            %user_id,
            services = subscription.service_ids.len(),
            "Subscription saved",
        );
        Ok(subscription)
    }

    pub async fn unsubscribe(&self, user_id: DbId) -> Result<(), CoreError> {
        self.store
            .delete_subscription(user_id)
            .await
            .map_err(|e| miss("deleting subscription", e))?;
        tracing::info!(%user_id, "Subscription removed");
        Ok(())
    }
}

fn miss(context: &str, err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::NotFound("Subscription".to_string()),
        other => CoreError::Internal(format!("{context}: {other}")),
    }
}

//! Repository for notification channels and service subscriptions.

use sqlx::PgPool;
use statuspage_core::types::DbId;

use crate::models::subscriber::{CreateNotificationChannel, NotificationChannel, Subscription};

/// Subscription columns, aliased on `s`, with the covered service ids folded in.
const SUBSCRIPTION_COLUMNS: &str = "s.id, s.user_id, \
                                    ARRAY(SELECT ss.service_id FROM subscription_services ss \
                                          WHERE ss.subscription_id = s.id ORDER BY ss.service_id) AS service_ids, \
                                    s.created_at";

/// Column list shared across queries to avoid repetition.
const CHANNEL_COLUMNS: &str =
    "c.id, c.user_id, c.channel_type, c.target, c.is_enabled, c.is_verified, c.created_at, c.updated_at";

pub struct SubscriberRepo;

impl SubscriberRepo {
    /// Register a notification channel for a user.
    pub async fn create_channel(
        pool: &PgPool,
        input: &CreateNotificationChannel,
    ) -> Result<NotificationChannel, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_channels AS c (user_id, channel_type, target, is_enabled, is_verified)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {CHANNEL_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationChannel>(&query)
            .bind(input.user_id)
            .bind(input.channel_type.as_str())
            .bind(&input.target)
            .bind(input.is_enabled)
            .bind(input.is_verified)
            .fetch_one(pool)
            .await
    }

    /// The subscription of a user, if any.
    pub async fn find_subscription(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query =
            format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s WHERE s.user_id = $1");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create or replace a user's subscription. An empty `service_ids`
    /// subscribes the user to every service.
    pub async fn set_subscription(
        pool: &PgPool,
        user_id: DbId,
        service_ids: &[DbId],
    ) -> Result<Subscription, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (subscription_id,): (DbId,) = sqlx::query_as(
            "INSERT INTO subscriptions (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING id",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM subscription_services WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(&mut *tx)
            .await?;

        if !service_ids.is_empty() {
            sqlx::query(
                "INSERT INTO subscription_services (subscription_id, service_id)
                 SELECT $1, UNNEST($2::uuid[])
                 ON CONFLICT DO NOTHING",
            )
            .bind(subscription_id)
            .bind(service_ids)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s WHERE s.id = $1");
        let subscription = sqlx::query_as::<_, Subscription>(&query)
            .bind(subscription_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(subscription)
    }

    /// Remove a user's subscription and its service rows. Returns `true` if
    /// one existed.
    pub async fn delete_subscription(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All channels of users subscribed to any of `service_ids`, including
    /// users subscribed to every service. Ordered by user so callers can
    /// group consecutive rows.
    pub async fn channels_for_services(
        pool: &PgPool,
        service_ids: &[DbId],
    ) -> Result<Vec<NotificationChannel>, sqlx::Error> {
        let query = format!(
            "SELECT {CHANNEL_COLUMNS} FROM notification_channels c
             WHERE c.user_id IN (
                 SELECT s.user_id FROM subscriptions s
                 WHERE NOT EXISTS (
                           SELECT 1 FROM subscription_services ss WHERE ss.subscription_id = s.id)
                    OR EXISTS (
                           SELECT 1 FROM subscription_services ss
                           WHERE ss.subscription_id = s.id AND ss.service_id = ANY($1))
             )
             ORDER BY c.user_id, c.created_at, c.id"
        );
        sqlx::query_as::<_, NotificationChannel>(&query)
            .bind(service_ids)
            .fetch_all(pool)
            .await
    }
}

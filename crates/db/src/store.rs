//! Capability traits the services depend on, and their Postgres backend.
//!
//! Each trait covers one collaborator: credentials for the authentication
//! engine, events and templates for the event state machine, subscribers for
//! notification dispatch. Misses are reported as [`StoreError::NotFound`]
//! rather than `Option` so every backend agrees on the shape.

use async_trait::async_trait;
use statuspage_core::types::DbId;

use crate::models::event::{CreateEvent, Event, EventFilters, EventUpdate, NewEventUpdate};
use crate::models::event_template::{CreateEventTemplate, EventTemplate, UpdateEventTemplate};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::models::subscriber::{NotificationChannel, Subscriber, Subscription};
use crate::models::user::{CreateUser, User};
use crate::repositories::{
    EventRepo, EventTemplateRepo, RefreshTokenRepo, SubscriberRepo, UserRepo,
};
use crate::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            // PostgreSQL unique constraint violation: error code 23505
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::AlreadyExists
            }
            // Foreign key violation (23503): the referenced row is gone.
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                StoreError::NotFound
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

// ───────────────────────────────────── Traits ─────────────────────────────────────────

/// Users and refresh tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. [`StoreError::AlreadyExists`] if the email is taken.
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: DbId) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn create_refresh_token(
        &self,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError>;

    /// Atomically remove and return the token with this digest. Of two
    /// concurrent callers with the same digest, at most one gets `Ok`.
    async fn take_refresh_token(&self, token_hash: &str) -> Result<RefreshToken, StoreError>;

    /// Remove the token with this digest. `Ok(false)` if there was none.
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Remove every token of a user, returning how many were removed.
    async fn delete_user_refresh_tokens(&self, user_id: DbId) -> Result<u64, StoreError>;

    /// Remove every token whose expiry has passed, returning how many were removed.
    async fn delete_expired_refresh_tokens(&self) -> Result<u64, StoreError>;
}

/// Events, their update history, and message templates.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert an event together with its service associations, atomically.
    async fn create_event(&self, input: &CreateEvent) -> Result<Event, StoreError>;

    async fn find_event(&self, id: DbId) -> Result<Event, StoreError>;

    /// Newest first. Limit and offset are clamped.
    async fn list_events(&self, filters: &EventFilters) -> Result<Vec<Event>, StoreError>;

    /// Append an update and overwrite the event's status in one atomic step,
    /// filling `resolved_at` if the change resolves and it is still empty.
    /// Concurrent calls on the same event serialize.
    async fn record_update(
        &self,
        event_id: DbId,
        input: &NewEventUpdate,
    ) -> Result<(Event, EventUpdate), StoreError>;

    /// Newest first.
    async fn list_updates(&self, event_id: DbId) -> Result<Vec<EventUpdate>, StoreError>;

    /// Delete an event with its updates and service links.
    async fn delete_event(&self, id: DbId) -> Result<(), StoreError>;

    /// [`StoreError::AlreadyExists`] if the slug is taken.
    async fn create_template(
        &self,
        input: &CreateEventTemplate,
    ) -> Result<EventTemplate, StoreError>;

    async fn find_template(&self, id: DbId) -> Result<EventTemplate, StoreError>;

    async fn find_template_by_slug(&self, slug: &str) -> Result<EventTemplate, StoreError>;

    async fn list_templates(&self) -> Result<Vec<EventTemplate>, StoreError>;

    async fn update_template(
        &self,
        id: DbId,
        input: &UpdateEventTemplate,
    ) -> Result<EventTemplate, StoreError>;

    async fn delete_template(&self, id: DbId) -> Result<(), StoreError>;
}

/// Subscriptions and subscriber lookup for notification fan-out.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Users subscribed to any of `service_ids` (or to every service), each
    /// with all of their channels. Users without channels are omitted.
    async fn subscribers_for_services(
        &self,
        service_ids: &[DbId],
    ) -> Result<Vec<Subscriber>, StoreError>;

    async fn find_subscription(&self, user_id: DbId) -> Result<Subscription, StoreError>;

    /// Create the user's subscription or replace its service list. An empty
    /// list covers every service.
    async fn set_subscription(
        &self,
        user_id: DbId,
        service_ids: &[DbId],
    ) -> Result<Subscription, StoreError>;

    async fn delete_subscription(&self, user_id: DbId) -> Result<(), StoreError>;
}

/// Readiness probe.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Fold channels ordered by user into one [`Subscriber`] per user.
pub(crate) fn group_by_user(channels: Vec<NotificationChannel>) -> Vec<Subscriber> {
    let mut subscribers: Vec<Subscriber> = Vec::new();
    for channel in channels {
        match subscribers.last_mut() {
            Some(last) if last.user_id == channel.user_id => last.channels.push(channel),
            _ => subscribers.push(Subscriber {
                user_id: channel.user_id,
                channels: vec![channel],
            }),
        }
    }
    subscribers
}

// ───────────────────────────────────── Postgres ───────────────────────────────────────

/// Postgres backend delegating to the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<User, StoreError> {
        UserRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        UserRepo::find_by_email(&self.pool, email)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn create_refresh_token(
        &self,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError> {
        Ok(RefreshTokenRepo::create(&self.pool, input).await?)
    }

    async fn take_refresh_token(&self, token_hash: &str) -> Result<RefreshToken, StoreError> {
        RefreshTokenRepo::take_by_hash(&self.pool, token_hash)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(RefreshTokenRepo::delete_by_hash(&self.pool, token_hash).await?)
    }

    async fn delete_user_refresh_tokens(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(RefreshTokenRepo::delete_all_for_user(&self.pool, user_id).await?)
    }

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, StoreError> {
        Ok(RefreshTokenRepo::cleanup_expired(&self.pool).await?)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn create_event(&self, input: &CreateEvent) -> Result<Event, StoreError> {
        Ok(EventRepo::create(&self.pool, input).await?)
    }

    async fn find_event(&self, id: DbId) -> Result<Event, StoreError> {
        EventRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list_events(&self, filters: &EventFilters) -> Result<Vec<Event>, StoreError> {
        Ok(EventRepo::list(&self.pool, filters).await?)
    }

    async fn record_update(
        &self,
        event_id: DbId,
        input: &NewEventUpdate,
    ) -> Result<(Event, EventUpdate), StoreError> {
        EventRepo::record_update(&self.pool, event_id, input)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list_updates(&self, event_id: DbId) -> Result<Vec<EventUpdate>, StoreError> {
        Ok(EventRepo::list_updates(&self.pool, event_id).await?)
    }

    async fn delete_event(&self, id: DbId) -> Result<(), StoreError> {
        if EventRepo::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn create_template(
        &self,
        input: &CreateEventTemplate,
    ) -> Result<EventTemplate, StoreError> {
        Ok(EventTemplateRepo::create(&self.pool, input).await?)
    }

    async fn find_template(&self, id: DbId) -> Result<EventTemplate, StoreError> {
        EventTemplateRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_template_by_slug(&self, slug: &str) -> Result<EventTemplate, StoreError> {
        EventTemplateRepo::find_by_slug(&self.pool, slug)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list_templates(&self) -> Result<Vec<EventTemplate>, StoreError> {
        Ok(EventTemplateRepo::list(&self.pool).await?)
    }

    async fn update_template(
        &self,
        id: DbId,
        input: &UpdateEventTemplate,
    ) -> Result<EventTemplate, StoreError> {
        EventTemplateRepo::update(&self.pool, id, input)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_template(&self, id: DbId) -> Result<(), StoreError> {
        if EventTemplateRepo::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl SubscriberStore for PgStore {
    async fn subscribers_for_services(
        &self,
        service_ids: &[DbId],
    ) -> Result<Vec<Subscriber>, StoreError> {
        let channels = SubscriberRepo::channels_for_services(&self.pool, service_ids).await?;
        Ok(group_by_user(channels))
    }

    async fn find_subscription(&self, user_id: DbId) -> Result<Subscription, StoreError> {
        SubscriberRepo::find_subscription(&self.pool, user_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn set_subscription(
        &self,
        user_id: DbId,
        service_ids: &[DbId],
    ) -> Result<Subscription, StoreError> {
        Ok(SubscriberRepo::set_subscription(&self.pool, user_id, service_ids).await?)
    }

    async fn delete_subscription(&self, user_id: DbId) -> Result<(), StoreError> {
        if SubscriberRepo::delete_subscription(&self.pool, user_id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

//! In-memory store implementation.
//!
//! Suitable for tests and local experimentation. All state sits behind one
//! async mutex, so every trait method is atomic with respect to the others,
//! which gives the same guarantees the Postgres backend gets from
//! transactions and single-statement deletes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use statuspage_core::events::next_resolved_at;
use statuspage_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use statuspage_core::types::DbId;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::event::{CreateEvent, Event, EventFilters, EventUpdate, NewEventUpdate};
use crate::models::event_template::{CreateEventTemplate, EventTemplate, UpdateEventTemplate};
use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};
use crate::models::subscriber::{
    CreateNotificationChannel, NotificationChannel, Subscriber, Subscription,
};
use crate::models::user::{CreateUser, User};
use crate::store::{
    group_by_user, CredentialStore, EventStore, StoreError, StoreHealth, SubscriberStore,
};

#[derive(Default)]
struct Inner {
    users: HashMap<DbId, User>,
    /// Keyed by token digest.
    refresh_tokens: HashMap<String, RefreshToken>,
    /// Insertion order; listing walks it backwards for newest first.
    events: Vec<Event>,
    /// Insertion order, all events.
    updates: Vec<EventUpdate>,
    templates: Vec<EventTemplate>,
    channels: Vec<NotificationChannel>,
    /// Keyed by user id.
    subscriptions: HashMap<DbId, Subscription>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notification channel for a user.
    pub async fn add_channel(&self, input: CreateNotificationChannel) -> NotificationChannel {
        let now = Utc::now();
        let channel = NotificationChannel {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            channel_type: input.channel_type,
            target: input.target,
            is_enabled: input.is_enabled,
            is_verified: input.is_verified,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.channels.push(channel.clone());
        channel
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, input: &CreateUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::AlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            role: input.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<User, StoreError> {
        let inner = self.inner.lock().await;
        inner.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_refresh_token(
        &self,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&input.user_id) {
            return Err(StoreError::Backend(format!(
                "refresh token references unknown user {}",
                input.user_id
            )));
        }
        if inner.refresh_tokens.contains_key(&input.token_hash) {
            return Err(StoreError::AlreadyExists);
        }
        let token = RefreshToken {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            token_hash: input.token_hash.clone(),
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        inner
            .refresh_tokens
            .insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    async fn take_refresh_token(&self, token_hash: &str) -> Result<RefreshToken, StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .refresh_tokens
            .remove(token_hash)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.refresh_tokens.remove(token_hash).is_some())
    }

    async fn delete_user_refresh_tokens(&self, user_id: DbId) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.refresh_tokens.len();
        inner.refresh_tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - inner.refresh_tokens.len()) as u64)
    }

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let before = inner.refresh_tokens.len();
        inner.refresh_tokens.retain(|_, t| t.expires_at > now);
        Ok((before - inner.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, input: &CreateEvent) -> Result<Event, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(template_id) = input.template_id {
            if !inner.templates.iter().any(|t| t.id == template_id) {
                return Err(StoreError::NotFound);
            }
        }

        let mut service_ids = input.service_ids.clone();
        service_ids.sort();
        service_ids.dedup();

        let now = Utc::now();
        let event = Event {
            id: Uuid::now_v7(),
            title: input.title.clone(),
            event_type: input.event_type,
            status: input.status,
            severity: input.severity,
            description: input.description.clone(),
            started_at: input.started_at,
            resolved_at: None,
            scheduled_start_at: input.scheduled_start_at,
            scheduled_end_at: input.scheduled_end_at,
            notify_subscribers: input.notify_subscribers,
            template_id: input.template_id,
            created_by: input.created_by,
            service_ids,
            created_at: now,
            updated_at: now,
        };
        inner.events.push(event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: DbId) -> Result<Event, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_events(&self, filters: &EventFilters) -> Result<Vec<Event>, StoreError> {
        let limit = clamp_limit(filters.limit, DEFAULT_LIMIT, MAX_LIMIT) as usize;
        let offset = clamp_offset(filters.offset) as usize;

        let inner = self.inner.lock().await;
        Ok(inner
            .events
            .iter()
            .rev()
            .filter(|e| filters.event_type.is_none_or(|t| e.event_type == t))
            .filter(|e| filters.status.is_none_or(|s| e.status == s))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn record_update(
        &self,
        event_id: DbId,
        input: &NewEventUpdate,
    ) -> Result<(Event, EventUpdate), StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let event = inner
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(StoreError::NotFound)?;
        event.status = input.change.status;
        event.resolved_at = next_resolved_at(event.resolved_at, &input.change, now);
        event.updated_at = now;
        let event = event.clone();

        let update = EventUpdate {
            id: Uuid::now_v7(),
            event_id,
            status: input.change.status,
            message: input.message.clone(),
            notify_subscribers: input.notify_subscribers,
            created_by: input.created_by,
            created_at: now,
        };
        inner.updates.push(update.clone());

        Ok((event, update))
    }

    async fn list_updates(&self, event_id: DbId) -> Result<Vec<EventUpdate>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .updates
            .iter()
            .rev()
            .filter(|u| u.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn delete_event(&self, id: DbId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.events.len();
        inner.events.retain(|e| e.id != id);
        if inner.events.len() == before {
            return Err(StoreError::NotFound);
        }
        inner.updates.retain(|u| u.event_id != id);
        Ok(())
    }

    async fn create_template(
        &self,
        input: &CreateEventTemplate,
    ) -> Result<EventTemplate, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.templates.iter().any(|t| t.slug == input.slug) {
            return Err(StoreError::AlreadyExists);
        }
        let now = Utc::now();
        let template = EventTemplate {
            id: Uuid::now_v7(),
            slug: input.slug.clone(),
            event_type: input.event_type,
            title_template: input.title_template.clone(),
            body_template: input.body_template.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.templates.push(template.clone());
        Ok(template)
    }

    async fn find_template(&self, id: DbId) -> Result<EventTemplate, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_template_by_slug(&self, slug: &str) -> Result<EventTemplate, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .templates
            .iter()
            .find(|t| t.slug == slug)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_templates(&self) -> Result<Vec<EventTemplate>, StoreError> {
        let inner = self.inner.lock().await;
        let mut templates = inner.templates.clone();
        templates.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(templates)
    }

    async fn update_template(
        &self,
        id: DbId,
        input: &UpdateEventTemplate,
    ) -> Result<EventTemplate, StoreError> {
        let mut inner = self.inner.lock().await;
        let template = inner
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(event_type) = input.event_type {
            template.event_type = event_type;
        }
        if let Some(title) = &input.title_template {
            template.title_template = title.clone();
        }
        if let Some(body) = &input.body_template {
            template.body_template = body.clone();
        }
        template.updated_at = Utc::now();
        Ok(template.clone())
    }

    async fn delete_template(&self, id: DbId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.templates.len();
        inner.templates.retain(|t| t.id != id);
        if inner.templates.len() == before {
            return Err(StoreError::NotFound);
        }
        for event in inner.events.iter_mut() {
            if event.template_id == Some(id) {
                event.template_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn subscribers_for_services(
        &self,
        service_ids: &[DbId],
    ) -> Result<Vec<Subscriber>, StoreError> {
        let inner = self.inner.lock().await;
        let mut channels: Vec<NotificationChannel> = inner
            .channels
            .iter()
            .filter(|c| {
                inner.subscriptions.get(&c.user_id).is_some_and(|sub| {
                    sub.service_ids.is_empty()
                        || sub.service_ids.iter().any(|s| service_ids.contains(s))
                })
            })
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.user_id);
        Ok(group_by_user(channels))
    }

    async fn find_subscription(&self, user_id: DbId) -> Result<Subscription, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .subscriptions
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set_subscription(
        &self,
        user_id: DbId,
        service_ids: &[DbId],
    ) -> Result<Subscription, StoreError> {
        let mut service_ids = service_ids.to_vec();
        service_ids.sort();
        service_ids.dedup();

        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }
        let subscription = inner
            .subscriptions
            .entry(user_id)
            .or_insert_with(|| Subscription {
                id: Uuid::now_v7(),
                user_id,
                service_ids: Vec::new(),
                created_at: Utc::now(),
            });
        subscription.service_ids = service_ids;
        Ok(subscription.clone())
    }

    async fn delete_subscription(&self, user_id: DbId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .subscriptions
            .remove(&user_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

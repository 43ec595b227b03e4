//! Event lifecycle and template management over an [`EventStore`].
//!
//! Validation always runs before the first write. Store failures become
//! [`EventError::Internal`] with a context string; misses become the matching
//! not-found variant.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use statuspage_core::events::{
    plan_status_update, validate_new_event, EventError, EventStatus, EventType,
};
use statuspage_core::templates::{self, TemplateData};
use statuspage_core::types::{DbId, Timestamp};
use statuspage_db::models::event::{CreateEvent, Event, EventFilters, EventUpdate, NewEventUpdate};
use statuspage_db::models::event_template::{
    CreateEventTemplate, EventTemplate, UpdateEventTemplate,
};
use statuspage_db::{EventStore, StoreError};
use statuspage_events::Dispatcher;
use validator::Validate;

/// Events shown on the public status page.
pub const STATUS_RECENT_LIMIT: i64 = 10;
/// Events shown on the public history page.
pub const STATUS_HISTORY_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Body of `POST /events`. Enumerations arrive as raw strings so that an
/// unknown value maps to the precise domain error instead of a decode failure.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: String,
    pub severity: Option<String>,
    #[serde(default)]
    pub description: String,
    pub started_at: Option<Timestamp>,
    pub scheduled_start_at: Option<Timestamp>,
    pub scheduled_end_at: Option<Timestamp>,
    #[serde(default)]
    pub notify_subscribers: bool,
    pub template_id: Option<DbId>,
    #[serde(default)]
    pub service_ids: Vec<DbId>,
}

/// Body of `POST /events/{id}/updates`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddUpdateRequest {
    pub status: String,
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
    #[serde(default)]
    pub notify_subscribers: bool,
}

/// Query of `GET /events`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of `POST /templates`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 100, message = "slug must be 1-100 characters"))]
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[validate(length(min = 1, message = "title_template must not be empty"))]
    pub title_template: String,
    #[serde(default)]
    pub body_template: String,
}

/// Body of `PUT /templates/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[validate(length(min = 1, message = "title_template must not be empty"))]
    pub title_template: Option<String>,
    pub body_template: Option<String>,
}

/// A template rendered against sample data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedTemplate {
    pub title: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct EventService {
    store: Arc<dyn EventStore>,
    /// `None` disables notifications entirely.
    dispatcher: Option<Arc<Dispatcher>>,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Option<Arc<Dispatcher>>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn create_event(
        &self,
        created_by: DbId,
        input: CreateEventRequest,
    ) -> Result<Event, EventError> {
        let validated =
            validate_new_event(&input.event_type, &input.status, input.severity.as_deref())?;

        if let Some(template_id) = input.template_id {
            self.store
                .find_template(template_id)
                .await
                .map_err(|e| template_miss("loading template", e))?;
        }

        let event = self
            .store
            .create_event(&CreateEvent {
                title: input.title,
                event_type: validated.event_type,
                status: validated.status,
                severity: validated.severity,
                description: input.description,
                started_at: input.started_at,
                scheduled_start_at: input.scheduled_start_at,
                scheduled_end_at: input.scheduled_end_at,
                notify_subscribers: input.notify_subscribers,
                template_id: input.template_id,
                created_by,
                service_ids: dedup(input.service_ids),
            })
            .await
            // The template can vanish between the lookup above and the insert.
            .map_err(|e| template_miss("creating event", e))?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            status = %event.status,
            services = event.service_ids.len(),
            "Event created",
        );

        if event.notify_subscribers {
            self.notify(
                &event.service_ids,
                format!("[{}] {}", event.event_type, event.title),
                event.description.clone(),
            );
        }
        Ok(event)
    }

    pub async fn get_event(&self, id: DbId) -> Result<Event, EventError> {
        self.store
            .find_event(id)
            .await
            .map_err(|e| event_miss("loading event", e))
    }

    /// Newest first. Unknown filter values are rejected rather than ignored.
    pub async fn list_events(&self, query: ListEventsQuery) -> Result<Vec<Event>, EventError> {
        let event_type = query
            .event_type
            .as_deref()
            .map(str::parse::<EventType>)
            .transpose()
            .map_err(|_| EventError::InvalidEventType)?;
        let status = query
            .status
            .as_deref()
            .map(str::parse::<EventStatus>)
            .transpose()
            .map_err(|_| EventError::InvalidStatus)?;

        self.store
            .list_events(&EventFilters {
                event_type,
                status,
                limit: query.limit,
                offset: query.offset,
            })
            .await
            .map_err(|e| internal("listing events", e))
    }

    /// The `limit` most recent events of any type.
    pub async fn recent_events(&self, limit: i64) -> Result<Vec<Event>, EventError> {
        self.list_events(ListEventsQuery {
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    /// Append a status update. The status must be legal for the event's type.
    pub async fn add_update(
        &self,
        event_id: DbId,
        created_by: DbId,
        input: AddUpdateRequest,
    ) -> Result<(Event, EventUpdate), EventError> {
        let event = self.get_event(event_id).await?;
        let change = plan_status_update(event.event_type, &input.status)?;

        let (event, update) = self
            .store
            .record_update(
                event_id,
                &NewEventUpdate {
                    change,
                    message: input.message,
                    notify_subscribers: input.notify_subscribers,
                    created_by,
                },
            )
            .await
            .map_err(|e| event_miss("recording update", e))?;

        tracing::info!(
            event_id = %event.id,
            status = %update.status,
            resolved = event.resolved_at.is_some(),
            "Event status updated",
        );

        if update.notify_subscribers {
            self.notify(
                &event.service_ids,
                format!("[{}] {}", update.status, event.title),
                update.message.clone(),
            );
        }
        Ok((event, update))
    }

    pub async fn list_updates(&self, event_id: DbId) -> Result<Vec<EventUpdate>, EventError> {
        self.get_event(event_id).await?;
        self.store
            .list_updates(event_id)
            .await
            .map_err(|e| internal("listing updates", e))
    }

    pub async fn delete_event(&self, id: DbId) -> Result<(), EventError> {
        self.store
            .delete_event(id)
            .await
            .map_err(|e| event_miss("deleting event", e))?;
        tracing::info!(event_id = %id, "Event deleted");
        Ok(())
    }

    // -- templates ----------------------------------------------------------

    pub async fn create_template(
        &self,
        input: CreateTemplateRequest,
    ) -> Result<EventTemplate, EventError> {
        let event_type: EventType = input
            .event_type
            .parse()
            .map_err(|_| EventError::InvalidEventType)?;
        templates::validate(&input.title_template)?;
        templates::validate(&input.body_template)?;

        let template = self
            .store
            .create_template(&CreateEventTemplate {
                slug: input.slug.clone(),
                event_type,
                title_template: input.title_template,
                body_template: input.body_template,
            })
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => EventError::TemplateSlugExists(input.slug),
                other => internal("creating template", other),
            })?;

        tracing::info!(template_id = %template.id, slug = %template.slug, "Template created");
        Ok(template)
    }

    pub async fn get_template_by_slug(&self, slug: &str) -> Result<EventTemplate, EventError> {
        self.store
            .find_template_by_slug(slug)
            .await
            .map_err(|e| template_miss("loading template", e))
    }

    pub async fn list_templates(&self) -> Result<Vec<EventTemplate>, EventError> {
        self.store
            .list_templates()
            .await
            .map_err(|e| internal("listing templates", e))
    }

    /// Re-validates every template string supplied before saving.
    pub async fn update_template(
        &self,
        id: DbId,
        input: UpdateTemplateRequest,
    ) -> Result<EventTemplate, EventError> {
        let event_type = input
            .event_type
            .as_deref()
            .map(str::parse::<EventType>)
            .transpose()
            .map_err(|_| EventError::InvalidEventType)?;
        for source in [&input.title_template, &input.body_template].into_iter().flatten() {
            templates::validate(source)?;
        }

        let template = self
            .store
            .update_template(
                id,
                &UpdateEventTemplate {
                    event_type,
                    title_template: input.title_template,
                    body_template: input.body_template,
                },
            )
            .await
            .map_err(|e| template_miss("updating template", e))?;

        tracing::info!(template_id = %template.id, slug = %template.slug, "Template updated");
        Ok(template)
    }

    pub async fn delete_template(&self, id: DbId) -> Result<(), EventError> {
        self.store
            .delete_template(id)
            .await
            .map_err(|e| template_miss("deleting template", e))?;
        tracing::info!(template_id = %id, "Template deleted");
        Ok(())
    }

    /// Render the template named by `slug` against sample data.
    pub async fn preview_template(
        &self,
        slug: &str,
        data: &TemplateData,
    ) -> Result<RenderedTemplate, EventError> {
        let template = self.get_template_by_slug(slug).await?;
        Ok(RenderedTemplate {
            title: templates::render(&template.title_template, data)?,
            body: templates::render(&template.body_template, data)?,
        })
    }

    fn notify(&self, service_ids: &[DbId], subject: String, body: String) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        if service_ids.is_empty() {
            tracing::debug!("Notification requested for an event without services; skipped");
            return;
        }
        dispatcher.dispatch_detached(service_ids.to_vec(), subject, body);
    }
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedup(ids: Vec<DbId>) -> Vec<DbId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn internal(context: &str, err: StoreError) -> EventError {
    EventError::Internal(format!("{context}: {err}"))
}

fn event_miss(context: &str, err: StoreError) -> EventError {
    match err {
        StoreError::NotFound => EventError::EventNotFound,
        other => internal(context, other),
    }
}

fn template_miss(context: &str, err: StoreError) -> EventError {
    match err {
        StoreError::NotFound => EventError::TemplateNotFound,
        other => internal(context, other),
    }
}

//! Event and event update models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use statuspage_core::events::{EventStatus, EventType, Severity, StatusChange};
use statuspage_core::types::{DbId, Timestamp};

use super::{decode_enum, decode_optional_enum};

/// An incident or maintenance record with its associated service ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: DbId,
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub status: EventStatus,
    pub severity: Option<Severity>,
    pub description: String,
    pub started_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub scheduled_start_at: Option<Timestamp>,
    pub scheduled_end_at: Option<Timestamp>,
    pub notify_subscribers: bool,
    pub template_id: Option<DbId>,
    pub created_by: DbId,
    pub service_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for Event {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            event_type: decode_enum(row, "event_type")?,
            status: decode_enum(row, "status")?,
            severity: decode_optional_enum(row, "severity")?,
            description: row.try_get("description")?,
            started_at: row.try_get("started_at")?,
            resolved_at: row.try_get("resolved_at")?,
            scheduled_start_at: row.try_get("scheduled_start_at")?,
            scheduled_end_at: row.try_get("scheduled_end_at")?,
            notify_subscribers: row.try_get("notify_subscribers")?,
            template_id: row.try_get("template_id")?,
            created_by: row.try_get("created_by")?,
            service_ids: row.try_get("service_ids")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// One entry of an event's append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventUpdate {
    pub id: DbId,
    pub event_id: DbId,
    pub status: EventStatus,
    pub message: String,
    pub notify_subscribers: bool,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for EventUpdate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            status: decode_enum(row, "status")?,
            message: row.try_get("message")?,
            notify_subscribers: row.try_get("notify_subscribers")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// DTO for inserting a validated event.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub title: String,
    pub event_type: EventType,
    pub status: EventStatus,
    pub severity: Option<Severity>,
    pub description: String,
    pub started_at: Option<Timestamp>,
    pub scheduled_start_at: Option<Timestamp>,
    pub scheduled_end_at: Option<Timestamp>,
    pub notify_subscribers: bool,
    pub template_id: Option<DbId>,
    pub created_by: DbId,
    pub service_ids: Vec<DbId>,
}

/// DTO for appending a validated status update to an event.
#[derive(Debug, Clone)]
pub struct NewEventUpdate {
    pub change: StatusChange,
    pub message: String,
    pub notify_subscribers: bool,
    pub created_by: DbId,
}

/// Filters for listing events. Limit and offset are clamped by the store.
#[derive(Debug, Clone, Default)]
pub struct EventFilters {
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

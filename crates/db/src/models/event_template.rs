//! Event template model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use statuspage_core::events::EventType;
use statuspage_core::types::{DbId, Timestamp};

use super::decode_enum;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: DbId,
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title_template: String,
    pub body_template: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for EventTemplate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            event_type: decode_enum(row, "event_type")?,
            title_template: row.try_get("title_template")?,
            body_template: row.try_get("body_template")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// DTO for creating a template. Both template strings must already parse.
#[derive(Debug, Clone)]
pub struct CreateEventTemplate {
    pub slug: String,
    pub event_type: EventType,
    pub title_template: String,
    pub body_template: String,
}

/// DTO for updating a template. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct UpdateEventTemplate {
    pub event_type: Option<EventType>,
    pub title_template: Option<String>,
    pub body_template: Option<String>,
}

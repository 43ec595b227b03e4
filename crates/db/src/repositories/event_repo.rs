//! Repository for the `events`, `event_updates` and `event_services` tables.

use sqlx::PgPool;
use statuspage_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use statuspage_core::types::DbId;

use crate::models::event::{CreateEvent, Event, EventFilters, EventUpdate, NewEventUpdate};

/// Event columns, aliased on `e`, with the associated service ids folded in.
const COLUMNS: &str = "e.id, e.title, e.event_type, e.status, e.severity, e.description, \
                        e.started_at, e.resolved_at, e.scheduled_start_at, e.scheduled_end_at, \
                        e.notify_subscribers, e.template_id, e.created_by, \
                        ARRAY(SELECT es.service_id FROM event_services es \
                              WHERE es.event_id = e.id ORDER BY es.service_id) AS service_ids, \
                        e.created_at, e.updated_at";

const UPDATE_COLUMNS: &str = "id, event_id, status, message, notify_subscribers, created_by, created_at";

/// Provides CRUD operations for events and their update history.
pub struct EventRepo;

impl EventRepo {
    /// Insert an event and its service associations in one transaction.
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<Event, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO events (title, event_type, status, severity, description, started_at,
                                 scheduled_start_at, scheduled_end_at, notify_subscribers,
                                 template_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING id",
        )
        .bind(&input.title)
        .bind(input.event_type.as_str())
        .bind(input.status.as_str())
        .bind(input.severity.map(|s| s.as_str()))
        .bind(&input.description)
        .bind(input.started_at)
        .bind(input.scheduled_start_at)
        .bind(input.scheduled_end_at)
        .bind(input.notify_subscribers)
        .bind(input.template_id)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await?;

        if !input.service_ids.is_empty() {
            sqlx::query(
                "INSERT INTO event_services (event_id, service_id)
                 SELECT $1, UNNEST($2::uuid[])
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(&input.service_ids)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!("SELECT {COLUMNS} FROM events e WHERE e.id = $1");
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(event)
    }

    /// Find an event by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events e WHERE e.id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List events newest first, optionally filtered by type and status.
    pub async fn list(pool: &PgPool, filters: &EventFilters) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events e
             WHERE ($1::text IS NULL OR e.event_type = $1)
               AND ($2::text IS NULL OR e.status = $2)
             ORDER BY e.created_at DESC, e.id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(filters.event_type.map(|t| t.as_str()))
            .bind(filters.status.map(|s| s.as_str()))
            .bind(clamp_limit(filters.limit, DEFAULT_LIMIT, MAX_LIMIT))
            .bind(clamp_offset(filters.offset))
            .fetch_all(pool)
            .await
    }

    /// Overwrite the event's status and append the matching history row.
    ///
    /// Both writes share one transaction. The `UPDATE` takes the row lock
    /// first, so concurrent updates to the same event serialize and each
    /// appends its own history row. `resolved_at` is only ever filled, never
    /// overwritten or cleared.
    ///
    /// Returns `None` if the event does not exist.
    pub async fn record_update(
        pool: &PgPool,
        event_id: DbId,
        input: &NewEventUpdate,
    ) -> Result<Option<(Event, EventUpdate)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE events e SET
                status = $2,
                resolved_at = CASE WHEN $3 THEN COALESCE(e.resolved_at, NOW()) ELSE e.resolved_at END,
                updated_at = NOW()
             WHERE e.id = $1
             RETURNING {COLUMNS}"
        );
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(event_id)
            .bind(input.change.status.as_str())
            .bind(input.change.resolves)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(event) = event else {
            tx.rollback().await?;
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO event_updates (event_id, status, message, notify_subscribers, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {UPDATE_COLUMNS}"
        );
        let update = sqlx::query_as::<_, EventUpdate>(&query)
            .bind(event_id)
            .bind(input.change.status.as_str())
            .bind(&input.message)
            .bind(input.notify_subscribers)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((event, update)))
    }

    /// List an event's updates, newest first.
    pub async fn list_updates(pool: &PgPool, event_id: DbId) -> Result<Vec<EventUpdate>, sqlx::Error> {
        let query = format!(
            "SELECT {UPDATE_COLUMNS} FROM event_updates
             WHERE event_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, EventUpdate>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    /// Delete an event. Updates and service links cascade.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

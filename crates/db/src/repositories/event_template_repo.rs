//! Repository for the `event_templates` table.

use sqlx::PgPool;
use statuspage_core::types::DbId;

use crate::models::event_template::{CreateEventTemplate, EventTemplate, UpdateEventTemplate};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, slug, event_type, title_template, body_template, created_at, updated_at";

/// Provides CRUD operations for event templates.
pub struct EventTemplateRepo;

impl EventTemplateRepo {
    /// Insert a new template. A duplicate slug is a unique violation.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEventTemplate,
    ) -> Result<EventTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO event_templates (slug, event_type, title_template, body_template)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventTemplate>(&query)
            .bind(&input.slug)
            .bind(input.event_type.as_str())
            .bind(&input.title_template)
            .bind(&input.body_template)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EventTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM event_templates WHERE id = $1");
        sqlx::query_as::<_, EventTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<EventTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM event_templates WHERE slug = $1");
        sqlx::query_as::<_, EventTemplate>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// List all templates ordered by slug.
    pub async fn list(pool: &PgPool) -> Result<Vec<EventTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM event_templates ORDER BY slug");
        sqlx::query_as::<_, EventTemplate>(&query)
            .fetch_all(pool)
            .await
    }

    /// Update a template. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEventTemplate,
    ) -> Result<Option<EventTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE event_templates SET
                event_type = COALESCE($2, event_type),
                title_template = COALESCE($3, title_template),
                body_template = COALESCE($4, body_template),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventTemplate>(&query)
            .bind(id)
            .bind(input.event_type.map(|t| t.as_str()))
            .bind(&input.title_template)
            .bind(&input.body_template)
            .fetch_optional(pool)
            .await
    }

    /// Delete a template. Events created from it keep their data and lose the
    /// reference. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM event_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

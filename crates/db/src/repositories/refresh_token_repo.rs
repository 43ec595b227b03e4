//! Repository for the `refresh_tokens` table.

use sqlx::PgPool;
use statuspage_core::types::DbId;

use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at";

/// Provides storage for refresh token digests.
pub struct RefreshTokenRepo;

impl RefreshTokenRepo {
    /// Insert a new refresh token digest, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Delete a token by digest and return the deleted row.
    ///
    /// This is the rotation primitive: `DELETE ... RETURNING` is a single
    /// statement, so of two concurrent callers presenting the same token at
    /// most one receives the row. Expired rows are returned too; the caller
    /// decides what expiry means.
    pub async fn take_by_hash(
        pool: &PgPool,
        hash: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let query = format!("DELETE FROM refresh_tokens WHERE token_hash = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(hash)
            .fetch_optional(pool)
            .await
    }

    /// Delete a token by digest. Returns `true` if a row was deleted.
    pub async fn delete_by_hash(pool: &PgPool, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every token belonging to a user. Returns the count deleted.
    pub async fn delete_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired tokens. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

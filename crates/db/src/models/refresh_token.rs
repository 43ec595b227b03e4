//! Refresh token model and DTOs.

use sqlx::FromRow;
use statuspage_core::types::{DbId, Timestamp};

/// A row from the `refresh_tokens` table. Only the SHA-256 digest of the
/// token handed to the client is stored.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// DTO for persisting a newly issued refresh token.
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
}

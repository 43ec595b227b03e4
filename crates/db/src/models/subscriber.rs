//! Notification channel and subscriber models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use statuspage_core::types::{DbId, ParseEnumError, Timestamp};

use super::decode_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Email,
    Telegram,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ChannelType::Email),
            "telegram" => Ok(ChannelType::Telegram),
            other => Err(ParseEnumError::new("channel type", other)),
        }
    }
}

/// A delivery address owned by a user: an email address or a Telegram chat id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: DbId,
    pub user_id: DbId,
    pub channel_type: ChannelType,
    pub target: String,
    pub is_enabled: bool,
    pub is_verified: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationChannel {
    /// Only enabled and verified channels receive notifications.
    pub fn is_deliverable(&self) -> bool {
        self.is_enabled && self.is_verified
    }
}

impl<'r> FromRow<'r, PgRow> for NotificationChannel {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            channel_type: decode_enum(row, "channel_type")?,
            target: row.try_get("target")?,
            is_enabled: row.try_get("is_enabled")?,
            is_verified: row.try_get("is_verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// DTO for registering a channel.
#[derive(Debug, Clone)]
pub struct CreateNotificationChannel {
    pub user_id: DbId,
    pub channel_type: ChannelType,
    pub target: String,
    pub is_enabled: bool,
    pub is_verified: bool,
}

/// A user subscribed to at least one of a set of services, with all of
/// their channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub user_id: DbId,
    pub channels: Vec<NotificationChannel>,
}

/// A user's service subscription. Empty `service_ids` covers every service.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Subscription {
    pub id: DbId,
    pub user_id: DbId,
    pub service_ids: Vec<DbId>,
    pub created_at: Timestamp,
}

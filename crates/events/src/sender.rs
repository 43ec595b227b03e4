use async_trait::async_trait;
use statuspage_db::models::subscriber::ChannelType;

use crate::email::EmailError;
use crate::telegram::TelegramError;

/// A rendered message addressed to one channel target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Channel-specific address: an email address or a Telegram chat id.
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("{0}")]
    Other(String),
}

/// Delivery backend for one channel type.
#[async_trait]
pub trait Sender: Send + Sync {
    fn channel_type(&self) -> ChannelType;

    async fn send(&self, notification: &Notification) -> Result<(), SendError>;
}

//! Telegram delivery through the Bot API `sendMessage` method.

use std::time::Duration;

use async_trait::async_trait;
use statuspage_db::models::subscriber::ChannelType;

use crate::sender::{Notification, SendError, Sender};

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Error type for Telegram delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Bot API returned a non-2xx status code.
    #[error("Telegram API returned HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Overridable for testing against a local stub.
    pub api_base: String,
}

impl TelegramConfig {
    /// Returns `None` if `TELEGRAM_BOT_TOKEN` is not set.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        Some(Self {
            bot_token,
            api_base: std::env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

/// Sends notifications as Telegram chat messages. The channel target is the
/// chat id.
pub struct TelegramSender {
    client: reqwest::Client,
    config: Option<TelegramConfig>,
}

impl TelegramSender {
    /// `None` yields a sender that logs instead of delivering.
    pub fn new(config: Option<TelegramConfig>) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }
}

fn message_text(notification: &Notification) -> String {
    format!("{}\n\n{}", notification.subject, notification.body)
}

#[async_trait]
impl Sender for TelegramSender {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Telegram
    }

    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let Some(config) = &self.config else {
            tracing::info!(
                chat_id = %notification.to,
                subject = %notification.subject,
                "Telegram not configured, notification logged only"
            );
            return Ok(());
        };

        let payload = serde_json::json!({
            "chat_id": notification.to,
            "text": message_text(notification),
        });

        let response = self
            .client
            .post(config.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(TelegramError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::HttpStatus(status.as_u16()).into());
        }

        tracing::info!(chat_id = %notification.to, "Telegram notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_embeds_token() {
        let config = TelegramConfig {
            bot_token: "123:abc".to_string(),
            api_base: "https://api.telegram.org/".to_string(),
        };
        assert_eq!(
            config.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn text_joins_subject_and_body() {
        let n = Notification {
            to: "42".to_string(),
            subject: "[maintenance] DB upgrade".to_string(),
            body: "Starts at 02:00 UTC".to_string(),
        };
        assert_eq!(message_text(&n), "[maintenance] DB upgrade\n\nStarts at 02:00 UTC");
    }

    #[tokio::test]
    async fn unconfigured_sender_logs_and_succeeds() {
        let sender = TelegramSender::new(None).unwrap();
        assert!(!sender.is_configured());
        let n = Notification {
            to: "42".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        sender.send(&n).await.unwrap();
    }

    #[test]
    fn status_error_display() {
        assert_eq!(
            TelegramError::HttpStatus(403).to_string(),
            "Telegram API returned HTTP 403"
        );
    }
}

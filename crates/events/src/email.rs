//! Email delivery via SMTP.
//!
//! [`EmailSender`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and the sender only logs what it
//! would have sent.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use statuspage_db::models::subscriber::ChannelType;

use crate::sender::{Notification, SendError, Sender};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "status@statuspage.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      |                            |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `status@statuspage.local`  |
    /// | `SMTP_USER`     | no       |                            |
    /// | `SMTP_PASSWORD` | no       |                            |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailSender
// ---------------------------------------------------------------------------

struct Smtp {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

/// Sends notifications as plain-text emails.
pub struct EmailSender {
    smtp: Option<Smtp>,
}

impl EmailSender {
    /// Build a sender for the given configuration. `None` yields a sender
    /// that logs instead of delivering.
    pub fn new(config: Option<EmailConfig>) -> Result<Self, EmailError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            smtp: Some(Smtp {
                from_address: config.from_address,
                transport: builder.build(),
            }),
        })
    }

    pub fn log_only() -> Self {
        Self { smtp: None }
    }

    pub fn is_configured(&self) -> bool {
        self.smtp.is_some()
    }
}

fn build_message(from: &str, notification: &Notification) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.parse()?)
        .to(notification.to.parse()?)
        .subject(notification.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body.clone())
        .map_err(|e| EmailError::Build(e.to_string()))
}

#[async_trait]
impl Sender for EmailSender {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let Some(smtp) = &self.smtp else {
            tracing::info!(
                to = %notification.to,
                subject = %notification.subject,
                "SMTP not configured, email notification logged only"
            );
            return Ok(());
        };

        let message = build_message(&smtp.from_address, notification)?;
        smtp.transport
            .send(message)
            .await
            .map_err(EmailError::from)?;

        tracing::info!(to = %notification.to, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

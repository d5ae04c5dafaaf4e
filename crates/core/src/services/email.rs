//! Outgoing email.
//!
//! Delivery goes through the [`Mailer`] trait. [`SmtpMailer`] sends through
//! an SMTP relay with lettre; [`LogMailer`] only logs and is used when no
//! SMTP relay is configured.

use std::sync::Arc;

use anitrack_common::{AppError, AppResult, config::EmailConfig};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tokio::sync::Mutex;

use super::verification::CodePurpose;

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message.
    async fn send(&self, message: EmailMessage) -> AppResult<()>;
}

/// SMTP delivery via lettre (STARTTLS relay).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from configuration.
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Config(format!("Invalid SMTP relay: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = format!("{} <{}>", config.from_name, config.from_address)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Config(format!("Invalid from address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid email address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body)
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;
        Ok(())
    }
}

/// Mailer that writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Email delivery disabled, logging message"
        );
        Ok(())
    }
}

/// Mailer that keeps messages in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryMailer {
    /// Create an empty mailer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    /// The most recent message sent to an address.
    pub async fn last_to(&self, to: &str) -> Option<EmailMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<()> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}

/// Pick the mailer for a configuration.
pub fn mailer_from_config(config: Option<&EmailConfig>) -> AppResult<Arc<dyn Mailer>> {
    match config {
        Some(config) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => {
            tracing::warn!("No SMTP relay configured, emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Renders and sends application emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    site_name: String,
}

impl EmailService {
    /// Create a new email service.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, site_name: impl Into<String>) -> Self {
        Self {
            mailer,
            site_name: site_name.into(),
        }
    }

    /// Send a one-time code.
    pub async fn send_code(
        &self,
        to: &str,
        purpose: CodePurpose,
        code: &str,
        ttl_secs: i64,
    ) -> AppResult<()> {
        let action = match purpose {
            CodePurpose::Register => "finish creating your account",
            CodePurpose::Login => "sign in",
            CodePurpose::ResetPassword => "reset your password",
            CodePurpose::ChangeContact => "confirm your new email address",
        };
        let minutes = (ttl_secs / 60).max(1);

        let message = EmailMessage {
            to: to.to_string(),
            subject: format!("[{}] Your verification code", self.site_name),
            body: format!(
                "Your {} verification code is {code}.\n\n\
                 Use it to {action}. It expires in {minutes} minutes.\n\n\
                 If you did not request this code, you can ignore this email.",
                self.site_name
            ),
        };

        self.mailer.send(message).await
    }
}

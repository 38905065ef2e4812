pub mod smtp;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MailConfig;

pub use smtp::SmtpMailer;

/// A rendered message ready for delivery
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("smtp transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Stand-in transport when no SMTP relay is configured: messages only reach the log
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "mail transport not configured, logging message");
        tracing::debug!("{}", email.text);
        Ok(())
    }
}

pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.smtp_host.as_deref() {
        Some(host) => Ok(Arc::new(SmtpMailer::new(config, host)?)),
        None => {
            warn!("EMAIL_HOST not set; outgoing mail will be logged instead of sent");
            Ok(Arc::new(LogMailer))
        }
    }
}

// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice email delivery for the AutoSpares backend.
//!
//! [`SmtpMailer`] implements [`MailAdapter`] over an async lettre SMTP
//! transport (STARTTLS). The HTML body comes from [`invoice::render_html`].

pub mod invoice;

use async_trait::async_trait;
use autospares_config::model::EmailConfig;
use autospares_core::types::Invoice;
use autospares_core::{AdapterType, HealthStatus, MailAdapter, PluginAdapter, StoreError};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info};

/// SMTP-backed invoice mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

impl SmtpMailer {
    /// Builds a mailer from `[email]`. Returns `Ok(None)` when `smtp_host` is unset.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, StoreError> {
        let Some(host) = config.smtp_host.as_deref().filter(|h| !h.trim().is_empty()) else {
            return Ok(None);
        };

        let from: Mailbox = config.from.parse().map_err(|e| {
            StoreError::Config(format!("email.from `{}` is not a valid mailbox: {e}", config.from))
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| email_error("failed to configure SMTP relay", e))?
            .port(config.smtp_port);

        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        info!(host, port = config.smtp_port, "SMTP mailer initialized");

        Ok(Some(Self {
            transport: builder.build(),
            from,
            host: host.to_string(),
        }))
    }
}

/// Builds the invoice message with a fresh `Message-ID`, which is returned alongside it.
pub fn build_message(
    from: &Mailbox,
    invoice: &Invoice,
    date: chrono::NaiveDate,
) -> Result<(Message, String), StoreError> {
    let to: Mailbox = invoice
        .to
        .parse()
        .map_err(|_| StoreError::Validation(format!("`{}` is not a valid email address", invoice.to)))?;

    let message_id = format!("<{}@autospareskenya.com>", uuid::Uuid::new_v4());
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(invoice::subject(invoice))
        .message_id(Some(message_id.clone()))
        .header(ContentType::TEXT_HTML)
        .body(invoice::render_html(invoice, date))
        .map_err(|e| email_error("failed to build invoice message", e))?;

    Ok((message, message_id))
}

fn email_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> StoreError {
    StoreError::Email {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mail
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded(format!("{} refused NOOP", self.host))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("SMTP mailer shutting down");
        Ok(())
    }
}

#[async_trait]
impl MailAdapter for SmtpMailer {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<String, StoreError> {
        let (message, message_id) =
            build_message(&self.from, invoice, chrono::Local::now().date_naive())?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| email_error("failed to send invoice email", e))?;
        info!(
            order_number = %invoice.order_number,
            message_id = %message_id,
            code = %response.code(),
            "invoice email sent"
        );
        Ok(message_id)
    }
}

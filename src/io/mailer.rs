//! Report delivery over SMTP
//!
//! One message per run: HTML body plus the CSV attachment. Port 465 uses
//! implicit TLS, any other port upgrades with STARTTLS. A single attempt is
//! made; failures are returned to the caller.

use crate::infra::config::Config;
use crate::infra::error::DeliveryError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const IMPLICIT_TLS_PORT: u16 = 465;

/// What gets sent
#[derive(Debug, Clone)]
pub struct Delivery {
    pub subject: String,
    pub html_body: String,
    pub attachment_path: PathBuf,
}

/// Outbound mail seam
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send(&self, delivery: &Delivery) -> Result<(), DeliveryError>;
}

fn parse_address(address: &str) -> Result<Address, DeliveryError> {
    address
        .parse::<Address>()
        .map_err(|source| DeliveryError::Address { address: address.to_string(), source })
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.csv".to_string())
}

/// SMTP relay mailer
pub struct SmtpMailer {
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let from = Mailbox::new(
            config.mail_from_name().map(str::to_string),
            parse_address(config.mail_from_address())?,
        );
        let to = config
            .mail_to()
            .iter()
            .map(|a| parse_address(a).map(|addr| Mailbox::new(None, addr)))
            .collect::<Result<Vec<_>, _>>()?;
        let cc = config
            .mail_cc()
            .iter()
            .map(|a| parse_address(a).map(|addr| Mailbox::new(None, addr)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = if config.smtp_port() == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(config.smtp_host())?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.smtp_host())?
        };
        builder = builder
            .port(config.smtp_port())
            .timeout(Some(Duration::from_millis(config.smtp_timeout_ms())));
        if !config.smtp_username().is_empty() {
            builder = builder.credentials(SmtpCredentials::new(
                config.smtp_username().to_string(),
                config.smtp_password().to_string(),
            ));
        }

        Ok(Self { from, to, cc, transport: builder.build(), host: config.smtp_host().to_string() })
    }

    /// Assemble the multipart message
    pub fn build_message(
        &self,
        delivery: &Delivery,
        attachment: Vec<u8>,
    ) -> Result<Message, DeliveryError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(&delivery.subject);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }

        let csv = Attachment::new(attachment_name(&delivery.attachment_path))
            .body(attachment, ContentType::parse("text/csv")?);

        let message = builder.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(delivery.html_body.clone()))
                .singlepart(csv),
        )?;
        Ok(message)
    }
}

#[async_trait]
impl ReportMailer for SmtpMailer {
    async fn send(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        let attachment = tokio::fs::read(&delivery.attachment_path).await.map_err(|source| {
            DeliveryError::Attachment { path: delivery.attachment_path.clone(), source }
        })?;
        let message = self.build_message(delivery, attachment)?;

        let response = self.transport.send(message).await?;
        info!(
            host = %self.host,
            to = %self.to.len(),
            cc = %self.cc.len(),
            code = %response.code(),
            "report_mail_sent"
        );
        Ok(())
    }
}

/// Writes the HTML body next to the attachment instead of sending
pub struct DryRunMailer;

impl DryRunMailer {
    pub fn body_path(attachment_path: &Path) -> PathBuf {
        attachment_path.with_extension("html")
    }
}

#[async_trait]
impl ReportMailer for DryRunMailer {
    async fn send(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        let path = Self::body_path(&delivery.attachment_path);
        tokio::fs::write(&path, &delivery.html_body)
            .await
            .map_err(|source| DeliveryError::DryRun { path: path.clone(), source })?;

        info!(
            subject = %delivery.subject,
            body = %path.display(),
            attachment = %delivery.attachment_path.display(),
            "dry_run_mail_skipped"
        );
        Ok(())
    }
}

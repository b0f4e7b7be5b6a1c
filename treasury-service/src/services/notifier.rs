//! At-most-once status notifications.
//!
//! The guard is shared by every workflow that mails a counterparty about
//! a status change: it resolves the recipient, skips duplicates using the
//! notification log, and never fails the caller's primary operation over
//! a delivery problem.

use crate::models::{NewNotification, NotificationStatus};
use crate::services::metrics::NOTIFICATIONS_TOTAL;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use treasury_core::error::AppError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
}

/// Append-only log of notification attempts, keyed by
/// (entity, target status) for the idempotency check.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn already_sent(&self, voucher_id: i64, voucher_status: &str)
        -> Result<bool, AppError>;
    async fn record(&self, entry: NewNotification) -> Result<(), AppError>;
}

/// Structured recipient from a supplier record.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub email: String,
    pub notifications_enabled: bool,
}

/// How the recipient was resolved: a structured supplier record wins,
/// a legacy freeform email (always treated as enabled) is the fallback.
#[derive(Debug, Clone, Default)]
pub struct RecipientResolution {
    pub structured: Option<Recipient>,
    pub legacy_email: Option<String>,
}

impl RecipientResolution {
    /// Fold a failed recipient lookup into "no recipient". The primary
    /// operation has already committed by the time resolution runs, so
    /// a lookup error must degrade to the skip-with-warning path, never
    /// fail the caller.
    pub fn or_empty(lookup: Result<Self, AppError>) -> Self {
        match lookup {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(error = %e, "Recipient lookup failed, notification will be skipped");
                Self::default()
            }
        }
    }
}

/// What the caller attaches to its response. A warning never turns the
/// primary operation into a failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutcome {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl NotificationOutcome {
    fn skipped(warning: impl Into<String>) -> Self {
        NOTIFICATIONS_TOTAL.with_label_values(&["skipped"]).inc();
        Self {
            sent: false,
            warning: Some(warning.into()),
        }
    }
}

pub async fn notify_status_change(
    log: &dyn NotificationLog,
    provider: &dyn EmailProvider,
    voucher_id: i64,
    target_status: &str,
    recipient: RecipientResolution,
    sent_by: i64,
) -> NotificationOutcome {
    let (email, enabled) = match (recipient.structured, recipient.legacy_email) {
        (Some(r), _) => (r.email, r.notifications_enabled),
        (None, Some(email)) => (email, true),
        (None, None) => {
            tracing::warn!(voucher_id, "No recipient email configured, skipping notification");
            return NotificationOutcome::skipped("No recipient email configured");
        }
    };

    if !enabled {
        tracing::info!(voucher_id, email = %email, "Recipient has notifications disabled");
        return NotificationOutcome::skipped("Recipient has notifications disabled");
    }

    match log.already_sent(voucher_id, target_status).await {
        Ok(true) => {
            tracing::info!(
                voucher_id,
                status = target_status,
                "Notification already sent for this status, skipping duplicate"
            );
            return NotificationOutcome::skipped("Notification already sent for this status");
        }
        Ok(false) => {}
        Err(e) => {
            // Cannot prove at-most-once without the log, so do not send.
            tracing::error!(voucher_id, error = %e, "Notification log lookup failed");
            return NotificationOutcome::skipped(format!("Notification log unavailable: {}", e));
        }
    }

    let subject = format!("Payment status update - {}", target_status);
    let message = EmailMessage {
        to: email.clone(),
        subject: subject.clone(),
        body: format!(
            "The payment voucher #{} has moved to status '{}'.",
            voucher_id, target_status
        ),
    };

    match provider.send(&message).await {
        Ok(()) => {
            NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
            if let Err(e) = log
                .record(NewNotification {
                    voucher_id,
                    email_to: email.clone(),
                    subject,
                    status: NotificationStatus::Sent,
                    sent_by,
                    voucher_status: target_status.to_string(),
                    error_message: None,
                })
                .await
            {
                // Bookkeeping is best-effort; the mail already went out.
                tracing::error!(voucher_id, error = %e, "Failed to record sent notification");
            }
            tracing::info!(voucher_id, email = %email, status = target_status, "Notification sent");
            NotificationOutcome {
                sent: true,
                warning: None,
            }
        }
        Err(send_err) => {
            NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
            tracing::error!(voucher_id, error = %send_err, "Notification delivery failed");
            if let Err(log_err) = log
                .record(NewNotification {
                    voucher_id,
                    email_to: email,
                    subject,
                    status: NotificationStatus::Failed,
                    sent_by,
                    voucher_status: target_status.to_string(),
                    error_message: Some(send_err.to_string()),
                })
                .await
            {
                tracing::error!(voucher_id, error = %log_err, "Failed to record failed notification");
            }
            NotificationOutcome {
                sent: false,
                warning: Some(send_err.to_string()),
            }
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

pub struct SmtpProvider {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self, ProviderError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailMessage) -> Result<(), ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "SMTP email provider is not enabled".to_string(),
            ));
        }

        let transport = self.transport.as_ref().ok_or_else(|| {
            ProviderError::Configuration("SMTP transport not initialized".to_string())
        })?;

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| {
                    ProviderError::Configuration(format!("Invalid from address: {}", e))
                })?;

        let to_mailbox: Mailbox = email
            .to
            .parse()
            .map_err(|e| ProviderError::InvalidRecipient(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| ProviderError::SendFailed(format!("Failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| ProviderError::SendFailed(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock email provider for testing
pub struct MockEmailProvider {
    enabled: bool,
    fail_sends: bool,
    send_count: AtomicU64,
}

impl MockEmailProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fail_sends: false,
            send_count: AtomicU64::new(0),
        }
    }

    /// A provider whose every send attempt fails with a delivery error.
    pub fn failing() -> Self {
        Self {
            enabled: true,
            fail_sends: true,
            send_count: AtomicU64::new(0),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &EmailMessage) -> Result<(), ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock email provider is not enabled".to_string(),
            ));
        }

        self.send_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_sends {
            return Err(ProviderError::SendFailed("simulated delivery failure".to_string()));
        }

        tracing::info!(to = %email.to, subject = %email.subject, "[MOCK] Email would be sent");

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

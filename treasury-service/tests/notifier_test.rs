//! Notification guard: at-most-once semantics, recipient resolution,
//! and failure isolation.

use async_trait::async_trait;
use std::sync::Mutex;
use treasury_service::models::{NewNotification, NotificationStatus};
use treasury_service::services::notifier::{
    notify_status_change, MockEmailProvider, NotificationLog, Recipient, RecipientResolution,
};
use treasury_core::error::AppError;

/// In-memory notification log for guard tests.
#[derive(Default)]
struct MemoryLog {
    entries: Mutex<Vec<NewNotification>>,
    fail_lookup: bool,
}

impl MemoryLog {
    fn with_sent(voucher_id: i64, voucher_status: &str) -> Self {
        let log = Self::default();
        log.entries.lock().unwrap().push(NewNotification {
            voucher_id,
            email_to: "pagos@lux.mx".to_string(),
            subject: "Payment status update".to_string(),
            status: NotificationStatus::Sent,
            sent_by: 1,
            voucher_status: voucher_status.to_string(),
            error_message: None,
        });
        log
    }

    fn failing_lookup() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail_lookup: true,
        }
    }

    fn recorded(&self) -> Vec<NewNotification> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationLog for MemoryLog {
    async fn already_sent(
        &self,
        voucher_id: i64,
        voucher_status: &str,
    ) -> Result<bool, AppError> {
        if self.fail_lookup {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "log unavailable"
            )));
        }
        Ok(self.entries.lock().unwrap().iter().any(|e| {
            e.voucher_id == voucher_id
                && e.voucher_status == voucher_status
                && e.status == NotificationStatus::Sent
        }))
    }

    async fn record(&self, entry: NewNotification) -> Result<(), AppError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

fn structured(email: &str, enabled: bool) -> RecipientResolution {
    RecipientResolution {
        structured: Some(Recipient {
            email: email.to_string(),
            notifications_enabled: enabled,
        }),
        legacy_email: None,
    }
}

#[tokio::test]
async fn sends_and_records_on_the_happy_path() {
    let log = MemoryLog::default();
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "pendiente_complemento",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;

    assert!(outcome.sent);
    assert!(outcome.warning.is_none());
    assert_eq!(provider.send_count(), 1);

    let recorded = log.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status, NotificationStatus::Sent);
    assert_eq!(recorded[0].voucher_status, "pendiente_complemento");
}

#[tokio::test]
async fn duplicate_status_is_skipped_without_sending() {
    let log = MemoryLog::with_sent(9, "pendiente_complemento");
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "pendiente_complemento",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;

    assert!(!outcome.sent);
    assert!(outcome.warning.is_some());
    assert_eq!(provider.send_count(), 0);
    // No new log entries either.
    assert_eq!(log.recorded().len(), 1);
}

#[tokio::test]
async fn same_voucher_different_status_still_sends() {
    let log = MemoryLog::with_sent(9, "pendiente_complemento");
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;

    assert!(outcome.sent);
    assert_eq!(provider.send_count(), 1);
}

#[tokio::test]
async fn missing_recipient_warns_and_skips() {
    let log = MemoryLog::default();
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        RecipientResolution::default(),
        1,
    )
    .await;

    assert!(!outcome.sent);
    assert!(outcome.warning.is_some());
    assert_eq!(provider.send_count(), 0);
    assert!(log.recorded().is_empty());
}

#[tokio::test]
async fn disabled_recipient_warns_and_skips() {
    let log = MemoryLog::default();
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        structured("pagos@lux.mx", false),
        1,
    )
    .await;

    assert!(!outcome.sent);
    assert_eq!(provider.send_count(), 0);
}

#[tokio::test]
async fn legacy_email_fallback_is_treated_as_enabled() {
    let log = MemoryLog::default();
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        RecipientResolution {
            structured: None,
            legacy_email: Some("legacy@lux.mx".to_string()),
        },
        1,
    )
    .await;

    assert!(outcome.sent);
    let recorded = log.recorded();
    assert_eq!(recorded[0].email_to, "legacy@lux.mx");
}

#[tokio::test]
async fn structured_recipient_wins_over_legacy_email() {
    let log = MemoryLog::default();
    let provider = MockEmailProvider::new(true);

    notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        RecipientResolution {
            structured: Some(Recipient {
                email: "supplier@lux.mx".to_string(),
                notifications_enabled: true,
            }),
            legacy_email: Some("legacy@lux.mx".to_string()),
        },
        1,
    )
    .await;

    assert_eq!(log.recorded()[0].email_to, "supplier@lux.mx");
}

#[tokio::test]
async fn delivery_failure_records_failed_row_and_warns() {
    let log = MemoryLog::default();
    let provider = MockEmailProvider::failing();

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;

    assert!(!outcome.sent);
    assert!(outcome.warning.is_some());

    let recorded = log.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status, NotificationStatus::Failed);
    assert!(recorded[0].error_message.is_some());
}

#[tokio::test]
async fn failed_attempt_does_not_block_a_retry() {
    // A `failed` row is not a `sent` row: the next attempt still goes out.
    let log = MemoryLog::default();

    let failing = MockEmailProvider::failing();
    let first = notify_status_change(
        &log,
        &failing,
        9,
        "cierre_contable",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;
    assert!(!first.sent);

    let working = MockEmailProvider::new(true);
    let second = notify_status_change(
        &log,
        &working,
        9,
        "cierre_contable",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;
    assert!(second.sent);
}

#[tokio::test]
async fn recipient_lookup_failure_degrades_to_a_skip() {
    // The status write has already committed when resolution runs; a
    // lookup error must fold into "no recipient" and a warning, never
    // an error response.
    let folded = RecipientResolution::or_empty(Err(AppError::DatabaseError(anyhow::anyhow!(
        "connection reset"
    ))));
    assert!(folded.structured.is_none());
    assert!(folded.legacy_email.is_none());

    let log = MemoryLog::default();
    let provider = MockEmailProvider::new(true);
    let outcome = notify_status_change(&log, &provider, 9, "cierre_contable", folded, 1).await;

    assert!(!outcome.sent);
    assert!(outcome.warning.is_some());
    assert_eq!(provider.send_count(), 0);
}

#[test]
fn successful_lookup_passes_through_or_empty_unchanged() {
    let folded = RecipientResolution::or_empty(Ok(structured("pagos@lux.mx", true)));
    assert_eq!(
        folded.structured.as_ref().map(|r| r.email.as_str()),
        Some("pagos@lux.mx")
    );
}

#[tokio::test]
async fn log_lookup_failure_skips_instead_of_risking_a_duplicate() {
    let log = MemoryLog::failing_lookup();
    let provider = MockEmailProvider::new(true);

    let outcome = notify_status_change(
        &log,
        &provider,
        9,
        "cierre_contable",
        structured("pagos@lux.mx", true),
        1,
    )
    .await;

    assert!(!outcome.sent);
    assert!(outcome.warning.is_some());
    assert_eq!(provider.send_count(), 0);
}

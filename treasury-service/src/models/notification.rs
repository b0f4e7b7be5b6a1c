//! Notification audit log rows for the idempotency guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }
}

/// One outbound email attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub id: i64,
    pub voucher_id: i64,
    pub email_to: String,
    pub subject: String,
    pub status: String,
    pub sent_by: i64,
    pub voucher_status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a notification attempt.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub voucher_id: i64,
    pub email_to: String,
    pub subject: String,
    pub status: NotificationStatus,
    pub sent_by: i64,
    pub voucher_status: String,
    pub error_message: Option<String>,
}

//! Scheduled payment (payable) model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Payable workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    IdrallImported,
    PendingApproval,
    Approved,
    PaymentScheduled,
    PaymentPending,
    PaymentCompleted,
    VoucherUploaded,
    Closed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::IdrallImported => "idrall_imported",
            PaymentStatus::PendingApproval => "pending_approval",
            PaymentStatus::Approved => "approved",
            PaymentStatus::PaymentScheduled => "payment_scheduled",
            PaymentStatus::PaymentPending => "payment_pending",
            PaymentStatus::PaymentCompleted => "payment_completed",
            PaymentStatus::VoucherUploaded => "voucher_uploaded",
            PaymentStatus::Closed => "closed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idrall_imported" => Ok(PaymentStatus::IdrallImported),
            "pending_approval" => Ok(PaymentStatus::PendingApproval),
            "approved" => Ok(PaymentStatus::Approved),
            "payment_scheduled" => Ok(PaymentStatus::PaymentScheduled),
            "payment_pending" => Ok(PaymentStatus::PaymentPending),
            "payment_completed" => Ok(PaymentStatus::PaymentCompleted),
            "voucher_uploaded" => Ok(PaymentStatus::VoucherUploaded),
            "closed" => Ok(PaymentStatus::Closed),
            other => Err(format!("Invalid payment status: {}", other)),
        }
    }
}

/// Scheduled payment row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPayment {
    pub id: i64,
    pub company_id: i64,
    pub supplier_id: Option<i64>,
    pub supplier_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub source_type: String,
    pub notify_email: Option<String>,
    pub invoice_file_url: Option<String>,
    pub invoice_file_name: Option<String>,
    pub voucher_id: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a payable.
#[derive(Debug, Clone)]
pub struct CreateScheduledPayment {
    pub company_id: i64,
    pub supplier_id: Option<i64>,
    pub supplier_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub source_type: String,
    pub notify_email: Option<String>,
    pub created_by: Option<i64>,
}

/// Filter parameters for listing payables.
#[derive(Debug, Clone, Default)]
pub struct ListPaymentsFilter {
    pub company_id: Option<i64>,
    pub status: Option<PaymentStatus>,
}

use crate::models::{DocumentEntry, PaymentNotification, PaymentVoucher, ScheduledPayment};
use crate::services::notifier::NotificationOutcome;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("amount_not_positive"))
    }
}

/// Create a payable directly, without an invoice file.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(range(min = 1, message = "Company id must be positive"))]
    pub company_id: i64,
    pub supplier_id: Option<i64>,
    #[validate(length(min = 1, message = "Supplier name is required"))]
    pub supplier_name: String,
    #[validate(custom(function = validate_positive_amount))]
    pub amount: Decimal,
    pub currency: Option<String>,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[validate(email(message = "Invalid notification email"))]
    pub notify_email: Option<String>,
}

/// Confirm a payable from a staged invoice file: promotes the temp file
/// and creates the payment row in one step.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[validate(range(min = 1, message = "Payer company id must be positive"))]
    pub payer_company_id: i64,
    pub supplier_id: Option<i64>,
    #[validate(length(min = 1, message = "Supplier name is required"))]
    pub supplier_name: String,
    #[validate(custom(function = validate_positive_amount))]
    pub amount: Decimal,
    pub currency: Option<String>,
    pub due_date: NaiveDate,
    pub payment_date: NaiveDate,
    #[validate(length(min = 1, message = "Staged invoice key is required"))]
    pub invoice_temp_key: String,
    #[validate(length(min = 1, message = "Invoice file name is required"))]
    pub invoice_file_name: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[validate(email(message = "Invalid notification email"))]
    pub notify_email: Option<String>,
}

/// Status change request; the string is parsed against the relevant
/// status set in the handler so an invalid value is a 400, not a 500.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteVoucherRequest {
    pub reason: String,
}

impl DeleteVoucherRequest {
    /// Reason trimmed and bounds-checked: 1 to 500 characters.
    pub fn validated_reason(&self) -> Result<&str, String> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err("Deletion reason is required".to_string());
        }
        if reason.chars().count() > 500 {
            return Err("Deletion reason must be at most 500 characters".to_string());
        }
        Ok(reason)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsQuery {
    pub company_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVouchersQuery {
    pub company_id: Option<i64>,
    pub status: Option<String>,
}

/// Voucher as served to clients. The stored status is folded onto its
/// canonical value here, at the read boundary, so consumers never see
/// the legacy alias.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherResponse {
    #[serde(flatten)]
    pub voucher: PaymentVoucher,
}

impl From<PaymentVoucher> for VoucherResponse {
    fn from(mut voucher: PaymentVoucher) -> Self {
        if let Some(canonical) = voucher.canonical_status() {
            voucher.status = canonical.as_str().to_string();
        }
        Self { voucher }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherListResponse {
    pub vouchers: Vec<VoucherResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListResponse {
    pub payments: Vec<ScheduledPayment>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsResponse {
    pub scheduled_payment_id: i64,
    pub payment: ScheduledPayment,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVoucherResponse {
    pub success: bool,
    pub voucher_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayVoucherResponse {
    pub voucher: VoucherResponse,
    #[serde(rename = "requiresREP")]
    pub requires_rep: bool,
    pub new_status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    pub scheduled_payment: ScheduledPayment,
    pub payment_voucher: VoucherResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairResponse {
    pub success: bool,
    pub stats: crate::services::repair::RepairReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub voucher: VoucherResponse,
    pub notification: Option<NotificationOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub voucher_id: i64,
    pub notifications: Vec<PaymentNotification>,
}

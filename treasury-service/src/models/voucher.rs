//! Payment voucher model and its status machine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Voucher workflow status.
///
/// `factura_pagada` is a legacy alias of `pago_programado` still present in
/// stored rows; [`VoucherStatus::canonicalize`] folds it away at read
/// boundaries so grouping and reporting never see both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    PagoProgramado,
    FacturaPagada,
    PendienteComplemento,
    ComplementoRecibido,
    CierreContable,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::PagoProgramado => "pago_programado",
            VoucherStatus::FacturaPagada => "factura_pagada",
            VoucherStatus::PendienteComplemento => "pendiente_complemento",
            VoucherStatus::ComplementoRecibido => "complemento_recibido",
            VoucherStatus::CierreContable => "cierre_contable",
        }
    }

    /// Fold the legacy alias onto its canonical value.
    pub fn canonicalize(self) -> Self {
        match self {
            VoucherStatus::FacturaPagada => VoucherStatus::PagoProgramado,
            other => other,
        }
    }

    /// All stored spellings that mean this status, for filter queries.
    pub fn wire_aliases(&self) -> &'static [&'static str] {
        match self.canonicalize() {
            VoucherStatus::PagoProgramado => &["pago_programado", "factura_pagada"],
            VoucherStatus::PendienteComplemento => &["pendiente_complemento"],
            VoucherStatus::ComplementoRecibido => &["complemento_recibido"],
            VoucherStatus::CierreContable => &["cierre_contable"],
            // canonicalize never returns the alias itself
            VoucherStatus::FacturaPagada => unreachable!(),
        }
    }
}

impl FromStr for VoucherStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pago_programado" => Ok(VoucherStatus::PagoProgramado),
            "factura_pagada" => Ok(VoucherStatus::FacturaPagada),
            "pendiente_complemento" => Ok(VoucherStatus::PendienteComplemento),
            "complemento_recibido" => Ok(VoucherStatus::ComplementoRecibido),
            "cierre_contable" => Ok(VoucherStatus::CierreContable),
            other => Err(format!("Invalid voucher status: {}", other)),
        }
    }
}

/// Payment voucher row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVoucher {
    pub id: i64,
    pub company_id: i64,
    pub payer_company_id: Option<i64>,
    pub client_id: i64,
    pub client_name: String,
    pub scheduled_payment_id: Option<i64>,
    pub status: String,
    pub invoice_file_url: Option<String>,
    pub invoice_file_name: Option<String>,
    pub invoice_file_type: Option<String>,
    pub voucher_file_url: Option<String>,
    pub voucher_file_name: Option<String>,
    pub voucher_file_type: Option<String>,
    pub complement_file_url: Option<String>,
    pub complement_file_name: Option<String>,
    pub complement_file_type: Option<String>,
    pub extracted_amount: Option<Decimal>,
    pub extracted_date: Option<NaiveDate>,
    pub extracted_bank: Option<String>,
    pub extracted_reference: Option<String>,
    pub extracted_currency: Option<String>,
    pub extracted_origin_account: Option<String>,
    pub extracted_destination_account: Option<String>,
    pub extracted_tracking_key: Option<String>,
    pub extracted_beneficiary_name: Option<String>,
    pub ocr_confidence: Option<f64>,
    pub notes: Option<String>,
    pub uploaded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentVoucher {
    /// Current status folded onto its canonical value. Unknown stored
    /// strings are surfaced as-is nowhere: rows are only written through
    /// the validated enum, so this parse cannot fail in practice.
    pub fn canonical_status(&self) -> Option<VoucherStatus> {
        self.status.parse::<VoucherStatus>().ok().map(VoucherStatus::canonicalize)
    }
}

/// Input for creating a voucher.
#[derive(Debug, Clone)]
pub struct CreateVoucher {
    pub company_id: i64,
    pub payer_company_id: Option<i64>,
    pub client_id: i64,
    pub client_name: String,
    pub scheduled_payment_id: Option<i64>,
    pub status: VoucherStatus,
    pub voucher_file_url: Option<String>,
    pub voucher_file_name: Option<String>,
    pub voucher_file_type: Option<String>,
    pub extracted_amount: Option<Decimal>,
    pub extracted_date: Option<NaiveDate>,
    pub extracted_bank: Option<String>,
    pub extracted_reference: Option<String>,
    pub extracted_currency: Option<String>,
    pub ocr_confidence: Option<f64>,
    pub uploaded_by: Option<i64>,
}

/// Partial field edit (PUT). Only file attachments and notes are editable
/// this way; status moves through the dedicated endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVoucher {
    pub invoice_file_url: Option<String>,
    pub invoice_file_name: Option<String>,
    pub invoice_file_type: Option<String>,
    pub complement_file_url: Option<String>,
    pub complement_file_name: Option<String>,
    pub complement_file_type: Option<String>,
    pub notes: Option<String>,
}

impl UpdateVoucher {
    pub fn is_empty(&self) -> bool {
        self.invoice_file_url.is_none()
            && self.invoice_file_name.is_none()
            && self.invoice_file_type.is_none()
            && self.complement_file_url.is_none()
            && self.complement_file_name.is_none()
            && self.complement_file_type.is_none()
            && self.notes.is_none()
    }
}

/// Filter parameters for listing vouchers.
#[derive(Debug, Clone, Default)]
pub struct ListVouchersFilter {
    pub company_id: Option<i64>,
    pub status: Option<VoucherStatus>,
}

//! Document repertoire assembly for a payable.
//!
//! The repertoire is the ordered set of files tied to one scheduled
//! payment: the supplier invoice, the bank payment proof (voucher) and
//! the fiscal complement (REP). Assembly is a pure function so callers
//! never need to know the underlying join structure.

use crate::models::scheduled_payment::ScheduledPayment;
use crate::models::voucher::PaymentVoucher;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Voucher,
    Rep,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    #[serde(rename = "type")]
    pub kind: DocumentType,
    pub name: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_reference: Option<String>,
}

impl DocumentEntry {
    fn plain(kind: DocumentType, name: &str, url: &str, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            url: url.to_string(),
            uploaded_at,
            extracted_amount: None,
            extracted_date: None,
            extracted_bank: None,
            extracted_reference: None,
        }
    }
}

/// Assemble the document list in its fixed order: invoice, then voucher,
/// then REP. The REP can only appear when the voucher itself is present,
/// so the result always has between 0 and 3 entries.
pub fn build_documents(
    payment: &ScheduledPayment,
    voucher: Option<&PaymentVoucher>,
) -> Vec<DocumentEntry> {
    let mut documents = Vec::new();

    if let (Some(url), Some(name)) = (&payment.invoice_file_url, &payment.invoice_file_name) {
        documents.push(DocumentEntry::plain(
            DocumentType::Invoice,
            name,
            url,
            payment.created_at,
        ));
    }

    if let Some(voucher) = voucher {
        if let (Some(url), Some(name)) = (&voucher.voucher_file_url, &voucher.voucher_file_name) {
            let mut entry =
                DocumentEntry::plain(DocumentType::Voucher, name, url, voucher.created_at);
            entry.extracted_amount = voucher.extracted_amount;
            entry.extracted_date = voucher.extracted_date;
            entry.extracted_bank = voucher.extracted_bank.clone();
            entry.extracted_reference = voucher.extracted_reference.clone();
            documents.push(entry);
        }

        if let (Some(url), Some(name)) =
            (&voucher.complement_file_url, &voucher.complement_file_name)
        {
            documents.push(DocumentEntry::plain(
                DocumentType::Rep,
                name,
                url,
                voucher.updated_at,
            ));
        }
    }

    documents
}

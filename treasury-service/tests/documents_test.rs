//! Document repertoire assembly: fixed order, 0..=3 entries, REP only
//! with a voucher present.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use treasury_service::models::{
    build_documents, DocumentType, PaymentVoucher, ScheduledPayment,
};

fn payment(with_invoice: bool) -> ScheduledPayment {
    let ts = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
    ScheduledPayment {
        id: 41,
        company_id: 7,
        supplier_id: Some(3),
        supplier_name: "Aceros del Norte".to_string(),
        amount: Decimal::new(120000, 2),
        currency: "MXN".to_string(),
        due_date: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
        payment_date: None,
        status: "payment_scheduled".to_string(),
        reference: Some("F-1001".to_string()),
        notes: None,
        source_type: "idrall".to_string(),
        notify_email: None,
        invoice_file_url: with_invoice.then(|| "/uploads/facturas/2026/02/1-f.pdf".to_string()),
        invoice_file_name: with_invoice.then(|| "factura-1001.pdf".to_string()),
        voucher_id: None,
        paid_at: None,
        paid_by: None,
        created_by: Some(1),
        created_at: ts,
        updated_at: ts,
    }
}

fn voucher(with_proof: bool, with_complement: bool) -> PaymentVoucher {
    let ts = Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap();
    PaymentVoucher {
        id: 9,
        company_id: 7,
        payer_company_id: Some(7),
        client_id: 3,
        client_name: "Aceros del Norte".to_string(),
        scheduled_payment_id: Some(41),
        status: "pendiente_complemento".to_string(),
        invoice_file_url: None,
        invoice_file_name: None,
        invoice_file_type: None,
        voucher_file_url: with_proof.then(|| "/uploads/comprobantes/2026/02/2-c.pdf".to_string()),
        voucher_file_name: with_proof.then(|| "comprobante.pdf".to_string()),
        voucher_file_type: with_proof.then(|| "application/pdf".to_string()),
        complement_file_url: with_complement.then(|| "/uploads/rep/2026/02/3-r.xml".to_string()),
        complement_file_name: with_complement.then(|| "rep.xml".to_string()),
        complement_file_type: with_complement.then(|| "application/xml".to_string()),
        extracted_amount: Some(Decimal::new(120000, 2)),
        extracted_date: NaiveDate::from_ymd_opt(2026, 2, 2),
        extracted_bank: Some("BBVA".to_string()),
        extracted_reference: Some("F-1001".to_string()),
        extracted_currency: Some("MXN".to_string()),
        extracted_origin_account: None,
        extracted_destination_account: None,
        extracted_tracking_key: None,
        extracted_beneficiary_name: None,
        ocr_confidence: Some(0.9),
        notes: None,
        uploaded_by: Some(1),
        created_at: ts,
        updated_at: ts,
    }
}

#[test]
fn empty_payment_without_voucher_yields_no_documents() {
    let docs = build_documents(&payment(false), None);
    assert!(docs.is_empty());
}

#[test]
fn invoice_only() {
    let docs = build_documents(&payment(true), None);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].kind, DocumentType::Invoice);
    assert_eq!(docs[0].name, "factura-1001.pdf");
}

#[test]
fn full_repertoire_keeps_fixed_order() {
    let v = voucher(true, true);
    let docs = build_documents(&payment(true), Some(&v));
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].kind, DocumentType::Invoice);
    assert_eq!(docs[1].kind, DocumentType::Voucher);
    assert_eq!(docs[2].kind, DocumentType::Rep);
}

#[test]
fn voucher_entry_carries_extracted_fields() {
    let v = voucher(true, false);
    let docs = build_documents(&payment(false), Some(&v));
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].kind, DocumentType::Voucher);
    assert_eq!(docs[0].extracted_amount, Some(Decimal::new(120000, 2)));
    assert_eq!(docs[0].extracted_bank.as_deref(), Some("BBVA"));
}

#[test]
fn rep_without_proof_still_requires_voucher_record() {
    // Complement attached, bank proof missing: only the REP appears,
    // and only because the voucher record itself exists.
    let v = voucher(false, true);
    let docs = build_documents(&payment(false), Some(&v));
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].kind, DocumentType::Rep);

    let no_voucher = build_documents(&payment(false), None);
    assert!(no_voucher.iter().all(|d| d.kind != DocumentType::Rep));
}

#[test]
fn repertoire_never_exceeds_three_entries() {
    let v = voucher(true, true);
    let docs = build_documents(&payment(true), Some(&v));
    assert!(docs.len() <= 3);
}

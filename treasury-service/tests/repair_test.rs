//! Linkage repair decision logic.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use treasury_service::models::{PaymentVoucher, ScheduledPayment};
use treasury_service::services::repair::{repair_action, RepairAction};

fn voucher(id: i64, payment_id: i64) -> PaymentVoucher {
    let ts = Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap();
    PaymentVoucher {
        id,
        company_id: 1,
        payer_company_id: None,
        client_id: 2,
        client_name: "Proveedora Lux".to_string(),
        scheduled_payment_id: Some(payment_id),
        status: "pago_programado".to_string(),
        invoice_file_url: None,
        invoice_file_name: None,
        invoice_file_type: None,
        voucher_file_url: None,
        voucher_file_name: None,
        voucher_file_type: None,
        complement_file_url: None,
        complement_file_name: None,
        complement_file_type: None,
        extracted_amount: None,
        extracted_date: None,
        extracted_bank: None,
        extracted_reference: None,
        extracted_currency: None,
        extracted_origin_account: None,
        extracted_destination_account: None,
        extracted_tracking_key: None,
        extracted_beneficiary_name: None,
        ocr_confidence: None,
        notes: None,
        uploaded_by: None,
        created_at: ts,
        updated_at: ts,
    }
}

fn payment(id: i64, voucher_id: Option<i64>) -> ScheduledPayment {
    let ts = Utc.with_ymd_and_hms(2026, 1, 9, 8, 0, 0).unwrap();
    ScheduledPayment {
        id,
        company_id: 1,
        supplier_id: Some(2),
        supplier_name: "Proveedora Lux".to_string(),
        amount: Decimal::new(50000, 2),
        currency: "MXN".to_string(),
        due_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
        payment_date: None,
        status: "payment_scheduled".to_string(),
        reference: None,
        notes: None,
        source_type: "idrall".to_string(),
        notify_email: None,
        invoice_file_url: None,
        invoice_file_name: None,
        voucher_id,
        paid_at: None,
        paid_by: None,
        created_by: None,
        created_at: ts,
        updated_at: ts,
    }
}

#[test]
fn missing_payment_is_reported_not_repaired() {
    let v = voucher(9, 41);
    assert_eq!(repair_action(&v, None), RepairAction::MissingPayment);
}

#[test]
fn correct_reverse_link_needs_nothing() {
    let v = voucher(9, 41);
    let p = payment(41, Some(9));
    assert_eq!(repair_action(&v, Some(&p)), RepairAction::AlreadyLinked);
}

#[test]
fn absent_reverse_link_gets_relinked() {
    let v = voucher(9, 41);
    let p = payment(41, None);
    assert_eq!(repair_action(&v, Some(&p)), RepairAction::Relink);
}

#[test]
fn stale_reverse_link_gets_relinked() {
    let v = voucher(9, 41);
    let p = payment(41, Some(777));
    assert_eq!(repair_action(&v, Some(&p)), RepairAction::Relink);
}

#[test]
fn decision_is_idempotent_after_relink() {
    // Once the relink has been applied, a second pass sees a correct
    // reverse link and does nothing.
    let v = voucher(9, 41);
    let repaired = payment(41, Some(v.id));
    assert_eq!(repair_action(&v, Some(&repaired)), RepairAction::AlreadyLinked);
}

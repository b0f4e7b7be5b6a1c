//! Request validation: amount positivity, required fields, deletion
//! reason bounds.

use rust_decimal::Decimal;
use treasury_service::dtos::{ConfirmPaymentRequest, CreatePaymentRequest, DeleteVoucherRequest};
use validator::Validate;

fn confirm_request_json(amount: &str, with_payment_date: bool) -> String {
    let payment_date = if with_payment_date {
        r#""paymentDate": "2026-03-15","#
    } else {
        ""
    };
    format!(
        r#"{{
            "payerCompanyId": 7,
            "supplierName": "Aceros del Norte",
            "amount": "{amount}",
            "dueDate": "2026-03-10",
            {payment_date}
            "invoiceTempKey": "temp/abc-factura.pdf",
            "invoiceFileName": "factura.pdf"
        }}"#
    )
}

#[test]
fn confirm_accepts_a_complete_request() {
    let req: ConfirmPaymentRequest =
        serde_json::from_str(&confirm_request_json("1500.50", true)).unwrap();
    assert!(req.validate().is_ok());
    assert_eq!(req.amount, Decimal::new(150050, 2));
}

#[test]
fn confirm_rejects_missing_payment_date() {
    let result =
        serde_json::from_str::<ConfirmPaymentRequest>(&confirm_request_json("1500.50", false));
    assert!(result.is_err());
}

#[test]
fn confirm_rejects_zero_and_negative_amounts() {
    for amount in ["0", "-10.00"] {
        let req: ConfirmPaymentRequest =
            serde_json::from_str(&confirm_request_json(amount, true)).unwrap();
        assert!(req.validate().is_err(), "amount {} should fail", amount);
    }
}

#[test]
fn confirm_rejects_empty_supplier_name_and_temp_key() {
    let mut req: ConfirmPaymentRequest =
        serde_json::from_str(&confirm_request_json("100", true)).unwrap();
    req.supplier_name = String::new();
    assert!(req.validate().is_err());

    let mut req: ConfirmPaymentRequest =
        serde_json::from_str(&confirm_request_json("100", true)).unwrap();
    req.invoice_temp_key = String::new();
    assert!(req.validate().is_err());
}

#[test]
fn confirm_rejects_non_positive_payer_company_id() {
    for bad_id in [0, -5] {
        let mut req: ConfirmPaymentRequest =
            serde_json::from_str(&confirm_request_json("100", true)).unwrap();
        req.payer_company_id = bad_id;
        assert!(
            req.validate().is_err(),
            "payer company id {} should fail",
            bad_id
        );
    }
}

#[test]
fn create_payment_rejects_non_positive_company_id() {
    let mut req: CreatePaymentRequest = serde_json::from_str(
        r#"{
            "companyId": 3,
            "supplierName": "Proveedora Lux",
            "amount": "250.00",
            "dueDate": "2026-04-01"
        }"#,
    )
    .unwrap();
    assert!(req.validate().is_ok());

    req.company_id = 0;
    assert!(req.validate().is_err());

    req.company_id = -3;
    assert!(req.validate().is_err());
}

#[test]
fn create_payment_validates_amount_and_email() {
    let mut req: CreatePaymentRequest = serde_json::from_str(
        r#"{
            "companyId": 3,
            "supplierName": "Proveedora Lux",
            "amount": "250.00",
            "dueDate": "2026-04-01",
            "notifyEmail": "pagos@lux.mx"
        }"#,
    )
    .unwrap();
    assert!(req.validate().is_ok());

    req.amount = Decimal::ZERO;
    assert!(req.validate().is_err());

    req.amount = Decimal::new(100, 0);
    req.notify_email = Some("not-an-email".to_string());
    assert!(req.validate().is_err());
}

#[test]
fn delete_reason_requires_one_to_five_hundred_chars() {
    let empty = DeleteVoucherRequest {
        reason: "   ".to_string(),
    };
    assert!(empty.validated_reason().is_err());

    let one = DeleteVoucherRequest {
        reason: "x".to_string(),
    };
    assert_eq!(one.validated_reason().unwrap(), "x");

    let max = DeleteVoucherRequest {
        reason: "r".repeat(500),
    };
    assert!(max.validated_reason().is_ok());

    let too_long = DeleteVoucherRequest {
        reason: "r".repeat(501),
    };
    assert!(too_long.validated_reason().is_err());
}

#[test]
fn delete_reason_is_trimmed_before_bounds_check() {
    let padded = DeleteVoucherRequest {
        reason: "  duplicated upload  ".to_string(),
    };
    assert_eq!(padded.validated_reason().unwrap(), "duplicated upload");

    // 500 meaningful chars surrounded by whitespace still passes.
    let padded_max = DeleteVoucherRequest {
        reason: format!("  {}  ", "r".repeat(500)),
    };
    assert!(padded_max.validated_reason().is_ok());
}

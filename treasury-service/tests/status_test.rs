//! Status enum closure and legacy alias folding.

use treasury_service::models::{PaymentStatus, VoucherStatus};

#[test]
fn voucher_status_round_trips_every_variant() {
    let all = [
        VoucherStatus::PagoProgramado,
        VoucherStatus::FacturaPagada,
        VoucherStatus::PendienteComplemento,
        VoucherStatus::ComplementoRecibido,
        VoucherStatus::CierreContable,
    ];
    for status in all {
        assert_eq!(status.as_str().parse::<VoucherStatus>(), Ok(status));
    }
}

#[test]
fn voucher_status_rejects_unknown_values() {
    assert!("pagado".parse::<VoucherStatus>().is_err());
    assert!("".parse::<VoucherStatus>().is_err());
    assert!("PAGO_PROGRAMADO".parse::<VoucherStatus>().is_err());
    assert!("cierre".parse::<VoucherStatus>().is_err());
}

#[test]
fn legacy_alias_folds_onto_canonical_value() {
    assert_eq!(
        VoucherStatus::FacturaPagada.canonicalize(),
        VoucherStatus::PagoProgramado
    );
    // Every other variant is a fixed point.
    for status in [
        VoucherStatus::PagoProgramado,
        VoucherStatus::PendienteComplemento,
        VoucherStatus::ComplementoRecibido,
        VoucherStatus::CierreContable,
    ] {
        assert_eq!(status.canonicalize(), status);
    }
}

#[test]
fn canonicalize_is_idempotent() {
    for status in [
        VoucherStatus::PagoProgramado,
        VoucherStatus::FacturaPagada,
        VoucherStatus::PendienteComplemento,
        VoucherStatus::ComplementoRecibido,
        VoucherStatus::CierreContable,
    ] {
        assert_eq!(status.canonicalize().canonicalize(), status.canonicalize());
    }
}

#[test]
fn wire_aliases_cover_both_spellings_of_the_scheduled_state() {
    assert_eq!(
        VoucherStatus::PagoProgramado.wire_aliases(),
        &["pago_programado", "factura_pagada"]
    );
    assert_eq!(
        VoucherStatus::FacturaPagada.wire_aliases(),
        &["pago_programado", "factura_pagada"]
    );
    assert_eq!(
        VoucherStatus::CierreContable.wire_aliases(),
        &["cierre_contable"]
    );
}

#[test]
fn payment_status_round_trips_every_variant() {
    let all = [
        PaymentStatus::IdrallImported,
        PaymentStatus::PendingApproval,
        PaymentStatus::Approved,
        PaymentStatus::PaymentScheduled,
        PaymentStatus::PaymentPending,
        PaymentStatus::PaymentCompleted,
        PaymentStatus::VoucherUploaded,
        PaymentStatus::Closed,
    ];
    for status in all {
        assert_eq!(status.as_str().parse::<PaymentStatus>(), Ok(status));
    }
}

#[test]
fn payment_status_rejects_unknown_values() {
    assert!("paid".parse::<PaymentStatus>().is_err());
    assert!("cancelled".parse::<PaymentStatus>().is_err());
}

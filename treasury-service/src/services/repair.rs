//! Voucher-payable linkage repair.
//!
//! The payable carries a cached back-reference (`voucher_id`) to the
//! voucher that paid it. Imports and manual edits can leave that cache
//! stale; the repair job walks every voucher with a forward link and
//! restores the reverse one.

use crate::models::{PaymentVoucher, ScheduledPayment};
use crate::services::database::Database;
use serde::Serialize;
use tracing::{info, instrument, warn};
use treasury_core::error::AppError;

/// What a single voucher-payment pair needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    /// Reverse link already points at this voucher.
    AlreadyLinked,
    /// Reverse link is missing or points elsewhere; rewrite it.
    Relink,
    /// Forward link points at a payable that no longer exists.
    MissingPayment,
}

/// Decide what a voucher's forward link requires of the payable side.
pub fn repair_action(
    voucher: &PaymentVoucher,
    payment: Option<&ScheduledPayment>,
) -> RepairAction {
    match payment {
        None => RepairAction::MissingPayment,
        Some(p) if p.voucher_id == Some(voucher.id) => RepairAction::AlreadyLinked,
        Some(_) => RepairAction::Relink,
    }
}

/// Outcome of a full repair pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub total_vouchers: usize,
    pub repaired: usize,
    pub already_linked: usize,
    pub errors: Vec<String>,
}

/// Walk every voucher carrying a payable reference and restore the
/// reverse link where it is stale. Per-record failures are collected
/// instead of aborting the pass.
#[instrument(skip(db))]
pub async fn repair_voucher_links(db: &Database) -> Result<RepairReport, AppError> {
    let vouchers = db.vouchers_with_payment_link().await?;

    let mut report = RepairReport {
        total_vouchers: vouchers.len(),
        repaired: 0,
        already_linked: 0,
        errors: Vec::new(),
    };

    for voucher in &vouchers {
        let Some(payment_id) = voucher.scheduled_payment_id else {
            continue;
        };

        let payment = match db.get_scheduled_payment(payment_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(voucher_id = voucher.id, payment_id, error = %e, "Repair lookup failed");
                report
                    .errors
                    .push(format!("voucher {}: {}", voucher.id, e));
                continue;
            }
        };

        match repair_action(voucher, payment.as_ref()) {
            RepairAction::AlreadyLinked => report.already_linked += 1,
            RepairAction::MissingPayment => {
                report.errors.push(format!(
                    "voucher {}: scheduled payment {} not found",
                    voucher.id, payment_id
                ));
            }
            RepairAction::Relink => match db.link_voucher(payment_id, voucher.id).await {
                Ok(_) => report.repaired += 1,
                Err(e) => {
                    warn!(voucher_id = voucher.id, payment_id, error = %e, "Relink failed");
                    report
                        .errors
                        .push(format!("voucher {}: {}", voucher.id, e));
                }
            },
        }
    }

    info!(
        total = report.total_vouchers,
        repaired = report.repaired,
        already_linked = report.already_linked,
        errors = report.errors.len(),
        "Voucher link repair completed"
    );

    Ok(report)
}

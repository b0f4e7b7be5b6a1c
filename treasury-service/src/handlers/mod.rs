pub mod health;
pub mod payments;
pub mod vouchers;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use payments::{
    confirm_payment, create_payment, delete_payment, list_payments, payment_documents,
    repair_links, stage_invoice, update_payment_status, upload_voucher,
};
pub use vouchers::{
    delete_voucher, get_voucher, list_vouchers, pay_voucher, update_voucher,
    update_voucher_status, voucher_notifications,
};

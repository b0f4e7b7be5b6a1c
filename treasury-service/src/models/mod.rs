//! Domain models for treasury-service.

pub mod documents;
pub mod notification;
pub mod scheduled_payment;
pub mod supplier;
pub mod voucher;

pub use documents::{build_documents, DocumentEntry, DocumentType};
pub use notification::{NewNotification, NotificationStatus, PaymentNotification};
pub use scheduled_payment::{
    CreateScheduledPayment, ListPaymentsFilter, PaymentStatus, ScheduledPayment,
};
pub use supplier::Supplier;
pub use voucher::{
    CreateVoucher, ListVouchersFilter, PaymentVoucher, UpdateVoucher, VoucherStatus,
};

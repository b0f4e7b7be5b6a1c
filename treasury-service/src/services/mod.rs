pub mod database;
pub mod metrics;
pub mod notifier;
pub mod repair;
pub mod storage;

pub use database::Database;
pub use notifier::{
    EmailMessage, EmailProvider, MockEmailProvider, NotificationLog, NotificationOutcome,
    Recipient, RecipientResolution, SmtpConfig, SmtpProvider,
};
pub use repair::{repair_action, repair_voucher_links, RepairAction, RepairReport};
pub use storage::{FileStore, LocalStorage, S3Storage, StagedFile, Storage, StoredFile};

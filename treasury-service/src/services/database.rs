//! Database service for treasury-service.

use crate::models::{
    CreateScheduledPayment, CreateVoucher, ListPaymentsFilter, ListVouchersFilter,
    NewNotification, PaymentNotification, PaymentStatus, PaymentVoucher, ScheduledPayment,
    Supplier, UpdateVoucher, VoucherStatus,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::notifier::NotificationLog;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, instrument};
use treasury_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "treasury-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scheduled Payment Operations
    // -------------------------------------------------------------------------

    /// Create a payable.
    #[instrument(skip(self, input), fields(company_id = input.company_id))]
    pub async fn create_scheduled_payment(
        &self,
        input: &CreateScheduledPayment,
    ) -> Result<ScheduledPayment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_scheduled_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, ScheduledPayment>(
            r#"
            INSERT INTO scheduled_payments (
                company_id, supplier_id, supplier_name, amount, currency,
                due_date, payment_date, status, reference, notes,
                source_type, notify_email, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(input.company_id)
        .bind(input.supplier_id)
        .bind(&input.supplier_name)
        .bind(input.amount)
        .bind(&input.currency)
        .bind(input.due_date)
        .bind(input.payment_date)
        .bind(input.status.as_str())
        .bind(&input.reference)
        .bind(&input.notes)
        .bind(&input.source_type)
        .bind(&input.notify_email)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create payment: {}", e)))?;

        timer.observe_duration();

        info!(payment_id = payment.id, supplier = %payment.supplier_name, "Scheduled payment created");

        Ok(payment)
    }

    /// Get a payable by id.
    #[instrument(skip(self))]
    pub async fn get_scheduled_payment(
        &self,
        id: i64,
    ) -> Result<Option<ScheduledPayment>, AppError> {
        let payment = sqlx::query_as::<_, ScheduledPayment>(
            "SELECT * FROM scheduled_payments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        Ok(payment)
    }

    /// List payables ordered by due date, optionally filtered.
    #[instrument(skip(self))]
    pub async fn list_scheduled_payments(
        &self,
        filter: &ListPaymentsFilter,
    ) -> Result<Vec<ScheduledPayment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_scheduled_payments"])
            .start_timer();

        let status = filter.status.map(|s| s.as_str().to_string());

        let payments = sqlx::query_as::<_, ScheduledPayment>(
            r#"
            SELECT * FROM scheduled_payments
            WHERE ($1::bigint IS NULL OR company_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY due_date ASC
            "#,
        )
        .bind(filter.company_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// Update a payable's workflow status.
    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        id: i64,
        status: PaymentStatus,
    ) -> Result<Option<ScheduledPayment>, AppError> {
        let payment = sqlx::query_as::<_, ScheduledPayment>(
            r#"
            UPDATE scheduled_payments
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update payment status: {}", e))
        })?;

        Ok(payment)
    }

    /// Attach the permanent invoice file to a payable.
    #[instrument(skip(self, url))]
    pub async fn set_payment_invoice_file(
        &self,
        id: i64,
        url: &str,
        name: &str,
    ) -> Result<Option<ScheduledPayment>, AppError> {
        let payment = sqlx::query_as::<_, ScheduledPayment>(
            r#"
            UPDATE scheduled_payments
            SET invoice_file_url = $2, invoice_file_name = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(url)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to set invoice file: {}", e))
        })?;

        Ok(payment)
    }

    /// Point a payable's cached reverse reference at a voucher.
    #[instrument(skip(self))]
    pub async fn link_voucher(
        &self,
        payment_id: i64,
        voucher_id: i64,
    ) -> Result<Option<ScheduledPayment>, AppError> {
        let payment = sqlx::query_as::<_, ScheduledPayment>(
            r#"
            UPDATE scheduled_payments
            SET voucher_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(voucher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to link voucher: {}", e)))?;

        Ok(payment)
    }

    /// Mark a payable as paid: status, paid-at/by stamps, and optionally
    /// the voucher back-reference in the same write.
    #[instrument(skip(self))]
    pub async fn mark_payment_paid(
        &self,
        id: i64,
        status: PaymentStatus,
        paid_by: i64,
        voucher_id: Option<i64>,
    ) -> Result<Option<ScheduledPayment>, AppError> {
        let payment = sqlx::query_as::<_, ScheduledPayment>(
            r#"
            UPDATE scheduled_payments
            SET status = $2,
                paid_at = now(),
                paid_by = $3,
                voucher_id = COALESCE($4, voucher_id),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(paid_by)
        .bind(voucher_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark payment paid: {}", e))
        })?;

        Ok(payment)
    }

    /// Hard delete of a payable. Deliberately asymmetric with the voucher
    /// soft-delete: payables have no audit archive.
    #[instrument(skip(self))]
    pub async fn delete_scheduled_payment(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM scheduled_payments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete payment: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Payment Voucher Operations
    // -------------------------------------------------------------------------

    /// Create a voucher.
    #[instrument(skip(self, input), fields(company_id = input.company_id))]
    pub async fn create_voucher(&self, input: &CreateVoucher) -> Result<PaymentVoucher, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_voucher"])
            .start_timer();

        let voucher = sqlx::query_as::<_, PaymentVoucher>(
            r#"
            INSERT INTO payment_vouchers (
                company_id, payer_company_id, client_id, client_name,
                scheduled_payment_id, status,
                voucher_file_url, voucher_file_name, voucher_file_type,
                extracted_amount, extracted_date, extracted_bank,
                extracted_reference, extracted_currency, ocr_confidence,
                uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(input.company_id)
        .bind(input.payer_company_id)
        .bind(input.client_id)
        .bind(&input.client_name)
        .bind(input.scheduled_payment_id)
        .bind(input.status.as_str())
        .bind(&input.voucher_file_url)
        .bind(&input.voucher_file_name)
        .bind(&input.voucher_file_type)
        .bind(input.extracted_amount)
        .bind(input.extracted_date)
        .bind(&input.extracted_bank)
        .bind(&input.extracted_reference)
        .bind(&input.extracted_currency)
        .bind(input.ocr_confidence)
        .bind(input.uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create voucher: {}", e)))?;

        timer.observe_duration();

        info!(voucher_id = voucher.id, status = %voucher.status, "Payment voucher created");

        Ok(voucher)
    }

    /// Get a voucher by id.
    #[instrument(skip(self))]
    pub async fn get_voucher(&self, id: i64) -> Result<Option<PaymentVoucher>, AppError> {
        let voucher =
            sqlx::query_as::<_, PaymentVoucher>("SELECT * FROM payment_vouchers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get voucher: {}", e))
                })?;

        Ok(voucher)
    }

    /// List vouchers, optionally filtered. The status filter matches the
    /// canonical value and its legacy alias together.
    #[instrument(skip(self))]
    pub async fn list_vouchers(
        &self,
        filter: &ListVouchersFilter,
    ) -> Result<Vec<PaymentVoucher>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_vouchers"])
            .start_timer();

        let statuses: Option<Vec<String>> = filter
            .status
            .map(|s| s.wire_aliases().iter().map(|a| a.to_string()).collect());

        let vouchers = sqlx::query_as::<_, PaymentVoucher>(
            r#"
            SELECT * FROM payment_vouchers
            WHERE ($1::bigint IS NULL OR company_id = $1)
              AND ($2::text[] IS NULL OR status = ANY($2))
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.company_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list vouchers: {}", e)))?;

        timer.observe_duration();

        Ok(vouchers)
    }

    /// Free status write (membership already validated by the caller).
    #[instrument(skip(self))]
    pub async fn update_voucher_status(
        &self,
        id: i64,
        status: VoucherStatus,
    ) -> Result<Option<PaymentVoucher>, AppError> {
        let voucher = sqlx::query_as::<_, PaymentVoucher>(
            r#"
            UPDATE payment_vouchers
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update voucher status: {}", e))
        })?;

        Ok(voucher)
    }

    /// Partial field edit; unset fields keep their current value. An
    /// optional status override rides along for the complement-received
    /// transition.
    #[instrument(skip(self, update))]
    pub async fn update_voucher_fields(
        &self,
        id: i64,
        update: &UpdateVoucher,
        new_status: Option<VoucherStatus>,
    ) -> Result<Option<PaymentVoucher>, AppError> {
        let voucher = sqlx::query_as::<_, PaymentVoucher>(
            r#"
            UPDATE payment_vouchers
            SET invoice_file_url = COALESCE($2, invoice_file_url),
                invoice_file_name = COALESCE($3, invoice_file_name),
                invoice_file_type = COALESCE($4, invoice_file_type),
                complement_file_url = COALESCE($5, complement_file_url),
                complement_file_name = COALESCE($6, complement_file_name),
                complement_file_type = COALESCE($7, complement_file_type),
                notes = COALESCE($8, notes),
                status = COALESCE($9, status),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.invoice_file_url)
        .bind(&update.invoice_file_name)
        .bind(&update.invoice_file_type)
        .bind(&update.complement_file_url)
        .bind(&update.complement_file_name)
        .bind(&update.complement_file_type)
        .bind(&update.notes)
        .bind(new_status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update voucher: {}", e)))?;

        Ok(voucher)
    }

    /// Record a bank payment against a voucher: new status, the proof
    /// file triple, and an appended note.
    #[instrument(skip(self, file_url, note))]
    pub async fn record_voucher_payment(
        &self,
        id: i64,
        status: VoucherStatus,
        file_url: &str,
        file_name: &str,
        file_type: &str,
        note: &str,
    ) -> Result<Option<PaymentVoucher>, AppError> {
        let voucher = sqlx::query_as::<_, PaymentVoucher>(
            r#"
            UPDATE payment_vouchers
            SET status = $2,
                voucher_file_url = $3,
                voucher_file_name = $4,
                voucher_file_type = $5,
                notes = CASE
                    WHEN notes IS NULL OR notes = '' THEN $6
                    ELSE notes || E'\n' || $6
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(file_url)
        .bind(file_name)
        .bind(file_type)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record voucher payment: {}", e))
        })?;

        Ok(voucher)
    }

    /// Latest voucher pointing at a payable, for document assembly when
    /// the payable's cached reverse link is stale.
    #[instrument(skip(self))]
    pub async fn get_voucher_for_payment(
        &self,
        payment_id: i64,
    ) -> Result<Option<PaymentVoucher>, AppError> {
        let voucher = sqlx::query_as::<_, PaymentVoucher>(
            r#"
            SELECT * FROM payment_vouchers
            WHERE scheduled_payment_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get voucher for payment: {}", e))
        })?;

        Ok(voucher)
    }

    /// All vouchers carrying a payable back-reference, for the link
    /// repair job.
    #[instrument(skip(self))]
    pub async fn vouchers_with_payment_link(&self) -> Result<Vec<PaymentVoucher>, AppError> {
        let vouchers = sqlx::query_as::<_, PaymentVoucher>(
            "SELECT * FROM payment_vouchers WHERE scheduled_payment_id IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list linked vouchers: {}", e))
        })?;

        Ok(vouchers)
    }

    /// Soft-delete: copy the voucher into the archive, then remove the
    /// live row, inside one transaction. If the archive insert fails the
    /// live row stays untouched.
    #[instrument(skip(self, reason))]
    pub async fn soft_delete_voucher(
        &self,
        id: i64,
        reason: &str,
        deleted_by: i64,
    ) -> Result<Option<i64>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["soft_delete_voucher"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let voucher = sqlx::query_as::<_, PaymentVoucher>(
            "SELECT * FROM payment_vouchers WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load voucher: {}", e)))?;

        let Some(voucher) = voucher else {
            return Ok(None);
        };

        let original_data = serde_json::to_value(&voucher).ok();

        // Archive first. A failure here rolls the transaction back and
        // the live row survives.
        sqlx::query(
            r#"
            INSERT INTO deleted_payment_vouchers (
                original_voucher_id, company_id, payer_company_id,
                client_id, client_name, status,
                voucher_file_url, voucher_file_name,
                extracted_amount, extracted_currency, extracted_reference, extracted_bank,
                original_created_at, deletion_reason, deleted_by, original_data
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(voucher.id)
        .bind(voucher.company_id)
        .bind(voucher.payer_company_id)
        .bind(voucher.client_id)
        .bind(&voucher.client_name)
        .bind(&voucher.status)
        .bind(&voucher.voucher_file_url)
        .bind(&voucher.voucher_file_name)
        .bind(voucher.extracted_amount)
        .bind(&voucher.extracted_currency)
        .bind(&voucher.extracted_reference)
        .bind(&voucher.extracted_bank)
        .bind(voucher.created_at)
        .bind(reason)
        .bind(deleted_by)
        .bind(original_data)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(voucher_id = id, error = %e, "Archive insert failed, aborting delete");
            AppError::DatabaseError(anyhow::anyhow!("Failed to archive voucher: {}", e))
        })?;

        sqlx::query("DELETE FROM payment_vouchers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(voucher_id = id, error = %e, "Live-row delete failed after archive insert");
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete voucher: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit delete: {}", e))
        })?;

        timer.observe_duration();

        info!(voucher_id = id, deleted_by, "Voucher archived and removed");

        Ok(Some(id))
    }

    // -------------------------------------------------------------------------
    // Supplier Operations
    // -------------------------------------------------------------------------

    /// Get a supplier by id.
    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: i64) -> Result<Option<Supplier>, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get supplier: {}", e))
            })?;

        Ok(supplier)
    }

    // -------------------------------------------------------------------------
    // Notification Log Operations
    // -------------------------------------------------------------------------

    /// Notification history for a voucher, newest first.
    #[instrument(skip(self))]
    pub async fn list_notifications(
        &self,
        voucher_id: i64,
    ) -> Result<Vec<PaymentNotification>, AppError> {
        let notifications = sqlx::query_as::<_, PaymentNotification>(
            "SELECT * FROM payment_notifications WHERE voucher_id = $1 ORDER BY created_at DESC",
        )
        .bind(voucher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list notifications: {}", e))
        })?;

        Ok(notifications)
    }
}

#[async_trait]
impl NotificationLog for Database {
    async fn already_sent(
        &self,
        voucher_id: i64,
        voucher_status: &str,
    ) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM payment_notifications
            WHERE voucher_id = $1 AND voucher_status = $2 AND status = 'sent'
            LIMIT 1
            "#,
        )
        .bind(voucher_id)
        .bind(voucher_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check notification log: {}", e))
        })?;

        Ok(row.is_some())
    }

    async fn record(&self, entry: NewNotification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payment_notifications (
                voucher_id, email_to, subject, status, sent_by, voucher_status, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.voucher_id)
        .bind(&entry.email_to)
        .bind(&entry.subject)
        .bind(entry.status.as_str())
        .bind(entry.sent_by)
        .bind(&entry.voucher_status)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record notification: {}", e))
        })?;

        Ok(())
    }
}

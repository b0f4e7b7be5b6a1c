//! Payment voucher endpoints.

use crate::dtos::{
    DeleteVoucherRequest, DeleteVoucherResponse, ListVouchersQuery, NotificationListResponse,
    PayVoucherResponse, StatusChangeResponse, UpdateStatusRequest, VoucherListResponse,
    VoucherResponse,
};
use crate::middleware::AuthUser;
use crate::models::{ListVouchersFilter, PaymentStatus, PaymentVoucher, UpdateVoucher, VoucherStatus};
use crate::services::metrics::VOUCHER_TRANSITIONS_TOTAL;
use crate::services::notifier::{notify_status_change, Recipient, RecipientResolution};
use crate::services::storage::content_type_for;
use crate::startup::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    Json,
};
use treasury_core::error::AppError;

/// Resolve who gets mailed about a voucher's status change: the linked
/// payable's supplier record if there is one, its freeform notify
/// email otherwise.
async fn resolve_recipient(
    state: &AppState,
    voucher: &PaymentVoucher,
) -> Result<RecipientResolution, AppError> {
    let Some(payment_id) = voucher.scheduled_payment_id else {
        return Ok(RecipientResolution::default());
    };

    let Some(payment) = state.db.get_scheduled_payment(payment_id).await? else {
        return Ok(RecipientResolution::default());
    };

    let structured = match payment.supplier_id {
        Some(supplier_id) => state
            .db
            .get_supplier(supplier_id)
            .await?
            .and_then(|s| {
                s.email.map(|email| Recipient {
                    email,
                    notifications_enabled: s.email_notifications,
                })
            }),
        None => None,
    };

    Ok(RecipientResolution {
        structured,
        legacy_email: payment.notify_email,
    })
}

/// GET /payment-vouchers
pub async fn list_vouchers(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListVouchersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<VoucherStatus>())
        .transpose()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let filter = ListVouchersFilter {
        company_id: params.company_id,
        status,
    };

    let vouchers = state.db.list_vouchers(&filter).await?;
    let total = vouchers.len();

    Ok(Json(VoucherListResponse {
        vouchers: vouchers.into_iter().map(VoucherResponse::from).collect(),
        total,
    }))
}

/// GET /payment-vouchers/:id
pub async fn get_voucher(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let voucher = state
        .db
        .get_voucher(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    Ok(Json(VoucherResponse::from(voucher)))
}

/// PUT /payment-vouchers/:id/status
///
/// Free transition within the status set. Any known status can move to
/// any other; membership is the only gate.
pub async fn update_voucher_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = req
        .status
        .parse::<VoucherStatus>()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let voucher = state
        .db
        .update_voucher_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    VOUCHER_TRANSITIONS_TOTAL
        .with_label_values(&[status.as_str()])
        .inc();

    let recipient = RecipientResolution::or_empty(resolve_recipient(&state, &voucher).await);
    let notification = notify_status_change(
        &state.db,
        state.mailer.as_ref(),
        voucher.id,
        status.as_str(),
        recipient,
        user.id,
    )
    .await;

    Ok(Json(StatusChangeResponse {
        voucher: VoucherResponse::from(voucher),
        notification: Some(notification),
    }))
}

/// PUT /payment-vouchers/:id
///
/// Partial edit of file attachments and notes. Attaching a complement
/// to a voucher waiting on one advances it to complemento_recibido.
pub async fn update_voucher(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateVoucher>,
) -> Result<impl IntoResponse, AppError> {
    if update.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "No fields to update"
        )));
    }

    let voucher = state
        .db
        .get_voucher(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    let new_status = if update.complement_file_url.is_some()
        && voucher.canonical_status() == Some(VoucherStatus::PendienteComplemento)
    {
        Some(VoucherStatus::ComplementoRecibido)
    } else {
        None
    };

    let voucher = state
        .db
        .update_voucher_fields(id, &update, new_status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    if let Some(status) = new_status {
        VOUCHER_TRANSITIONS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
    }

    Ok(Json(VoucherResponse::from(voucher)))
}

/// DELETE /payment-vouchers/:id
///
/// Soft delete: the row is copied into the audit archive before the
/// live row is removed.
pub async fn delete_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<DeleteVoucherRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reason = req
        .validated_reason()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let deleted = state
        .db
        .soft_delete_voucher(id, reason, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    Ok(Json(DeleteVoucherResponse {
        success: true,
        voucher_id: deleted,
        message: "Voucher archived and deleted".to_string(),
    }))
}

/// POST /payment-vouchers/:id/pay
///
/// Register the bank payment: requires the proof file, only valid from
/// the scheduled state, branches on the supplier's REP requirement and
/// advances the linked payable alongside.
pub async fn pay_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let voucher = state
        .db
        .get_voucher(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    if voucher.canonical_status() != Some(VoucherStatus::PagoProgramado) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Voucher must be in pago_programado to register a payment (current: {})",
            voucher.status
        )));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Payment proof file is required")))?;

    let original_name = field.file_name().unwrap_or("comprobante").to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    if data.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment proof file is required"
        )));
    }

    let content_type = content_type_for(&original_name).to_string();
    let stored = state
        .store
        .upload(data, "comprobantes", &original_name, &content_type)
        .await?;

    // Supplier REP requirement decides the landing status.
    let linked_payment = match voucher.scheduled_payment_id {
        Some(payment_id) => state.db.get_scheduled_payment(payment_id).await?,
        None => None,
    };

    let requires_rep = match linked_payment.as_ref().and_then(|p| p.supplier_id) {
        Some(supplier_id) => state
            .db
            .get_supplier(supplier_id)
            .await?
            .map(|s| s.requires_rep)
            .unwrap_or(false),
        None => false,
    };

    let new_status = if requires_rep {
        VoucherStatus::PendienteComplemento
    } else {
        VoucherStatus::CierreContable
    };

    let note = format!("Pago registrado: {}", original_name);
    let voucher = state
        .db
        .record_voucher_payment(id, new_status, &stored.url, &original_name, &content_type, &note)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    VOUCHER_TRANSITIONS_TOTAL
        .with_label_values(&[new_status.as_str()])
        .inc();

    if let Some(payment) = linked_payment {
        let payment_status = if requires_rep {
            PaymentStatus::VoucherUploaded
        } else {
            PaymentStatus::PaymentCompleted
        };
        state
            .db
            .mark_payment_paid(payment.id, payment_status, user.id, Some(voucher.id))
            .await?;
    }

    let recipient = RecipientResolution::or_empty(resolve_recipient(&state, &voucher).await);
    let notification = notify_status_change(
        &state.db,
        state.mailer.as_ref(),
        voucher.id,
        new_status.as_str(),
        recipient,
        user.id,
    )
    .await;

    let message = if requires_rep {
        "Payment registered; awaiting REP complement".to_string()
    } else {
        "Payment registered; voucher closed".to_string()
    };

    Ok(Json(PayVoucherResponse {
        voucher: VoucherResponse::from(voucher),
        requires_rep,
        new_status: new_status.as_str().to_string(),
        message,
        notification: Some(notification),
    }))
}

/// GET /payment-vouchers/:id/notifications
pub async fn voucher_notifications(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // 404 for a voucher that never existed keeps the endpoint honest.
    state
        .db
        .get_voucher(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment voucher {} not found", id)))?;

    let notifications = state.db.list_notifications(id).await?;

    Ok(Json(NotificationListResponse {
        voucher_id: id,
        notifications,
    }))
}

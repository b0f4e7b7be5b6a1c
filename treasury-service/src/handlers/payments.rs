//! Scheduled payment (payable) endpoints.

use crate::dtos::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentRequest, DocumentsResponse,
    ListPaymentsQuery, PaymentListResponse, RepairResponse, UpdateStatusRequest, VoucherResponse,
};
use crate::middleware::AuthUser;
use crate::models::{
    build_documents, CreateScheduledPayment, CreateVoucher, ListPaymentsFilter, PaymentStatus,
    VoucherStatus,
};
use crate::services::repair::repair_voucher_links;
use crate::startup::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;
use treasury_core::error::AppError;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Read the single file field out of a multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let original_name = field.file_name().unwrap_or("unnamed").to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    if data.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "File too large (max 20MB)"
        )));
    }

    Ok((original_name, data))
}

/// POST /treasury/invoices/stage
///
/// Stage an invoice file under temp storage; the returned key is later
/// passed to the confirm endpoint.
pub async fn stage_invoice(
    State(state): State<AppState>,
    _user: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (original_name, data) = read_upload(&mut multipart).await?;
    let staged = state.store.stage_temp(data, &original_name).await?;
    Ok((StatusCode::CREATED, Json(staged)))
}

/// GET /treasury/payments
pub async fn list_payments(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListPaymentsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<PaymentStatus>())
        .transpose()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let filter = ListPaymentsFilter {
        company_id: params.company_id,
        status,
    };

    let payments = state.db.list_scheduled_payments(&filter).await?;
    let total = payments.len();

    Ok(Json(PaymentListResponse { payments, total }))
}

/// POST /treasury/payments
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let input = CreateScheduledPayment {
        company_id: req.company_id,
        supplier_id: req.supplier_id,
        supplier_name: req.supplier_name,
        amount: req.amount,
        currency: req.currency.unwrap_or_else(|| "MXN".to_string()),
        due_date: req.due_date,
        payment_date: req.payment_date,
        status: PaymentStatus::PendingApproval,
        reference: req.reference,
        notes: req.notes,
        source_type: "manual".to_string(),
        notify_email: req.notify_email,
        created_by: Some(user.id),
    };

    let payment = state.db.create_scheduled_payment(&input).await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// PUT /treasury/payments/:id/status
pub async fn update_payment_status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = req
        .status
        .parse::<PaymentStatus>()
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let payment = state
        .db
        .update_payment_status(id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Scheduled payment {} not found", id)))?;

    Ok(Json(payment))
}

/// DELETE /treasury/payments/:id
///
/// Hard delete. Payables have no audit archive; only vouchers do.
pub async fn delete_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.db.delete_scheduled_payment(id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Scheduled payment {} not found",
            id
        )));
    }

    tracing::info!(payment_id = id, deleted_by = user.id, "Scheduled payment deleted");

    Ok(Json(json!({ "success": true, "paymentId": id })))
}

/// POST /treasury/payments/repair-voucher-links
pub async fn repair_links(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = repair_voucher_links(&state.db).await?;
    let errors = stats.errors.clone();

    Ok(Json(RepairResponse {
        success: true,
        stats,
        errors,
    }))
}

/// POST /scheduled-payments/confirm
///
/// Turn a staged invoice into a live payable: create the payment row,
/// promote the invoice file to permanent storage, then open the
/// companion voucher. The voucher keeps the forward link; the reverse
/// link is lazy and restored by the repair job.
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    if !state.store.temp_exists(&req.invoice_temp_key).await {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Staged invoice file not found: {}",
            req.invoice_temp_key
        )));
    }

    let currency = req.currency.clone().unwrap_or_else(|| "MXN".to_string());

    let payment = state
        .db
        .create_scheduled_payment(&CreateScheduledPayment {
            company_id: req.payer_company_id,
            supplier_id: req.supplier_id,
            supplier_name: req.supplier_name.clone(),
            amount: req.amount,
            currency: currency.clone(),
            due_date: req.due_date,
            payment_date: Some(req.payment_date),
            status: PaymentStatus::IdrallImported,
            reference: req.reference.clone(),
            notes: req.notes.clone(),
            source_type: "idrall".to_string(),
            notify_email: req.notify_email.clone(),
            created_by: Some(user.id),
        })
        .await?;

    let stored = state
        .store
        .promote_temp(&req.invoice_temp_key, "facturas", &req.invoice_file_name)
        .await?;

    let payment = state
        .db
        .set_payment_invoice_file(payment.id, &stored.url, &req.invoice_file_name)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Scheduled payment {} vanished during confirm",
                payment.id
            ))
        })?;

    let voucher = state
        .db
        .create_voucher(&CreateVoucher {
            company_id: req.payer_company_id,
            payer_company_id: Some(req.payer_company_id),
            client_id: req.supplier_id.unwrap_or(req.payer_company_id),
            client_name: req.supplier_name.clone(),
            scheduled_payment_id: Some(payment.id),
            status: VoucherStatus::PagoProgramado,
            voucher_file_url: None,
            voucher_file_name: None,
            voucher_file_type: None,
            extracted_amount: Some(req.amount),
            extracted_date: Some(req.payment_date),
            extracted_bank: None,
            extracted_reference: req.reference.clone(),
            extracted_currency: Some(currency),
            ocr_confidence: Some(0.9),
            uploaded_by: Some(user.id),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ConfirmPaymentResponse {
            scheduled_payment: payment,
            payment_voucher: VoucherResponse::from(voucher),
            message: "Payment confirmed and voucher created".to_string(),
        }),
    ))
}

/// GET /scheduled-payments/:id/documents
pub async fn payment_documents(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let payment = state
        .db
        .get_scheduled_payment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Scheduled payment {} not found", id)))?;

    // Cached reverse link first, voucher-side forward link as fallback.
    let voucher = match payment.voucher_id {
        Some(voucher_id) => state.db.get_voucher(voucher_id).await?,
        None => state.db.get_voucher_for_payment(payment.id).await?,
    };

    let documents = build_documents(&payment, voucher.as_ref());

    Ok(Json(DocumentsResponse {
        scheduled_payment_id: payment.id,
        documents,
        payment,
    }))
}

/// POST /scheduled-payments/:id/upload-voucher
///
/// Attach a bank payment proof to an existing payable. Unlike confirm,
/// this writes both link directions immediately.
pub async fn upload_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let payment = state
        .db
        .get_scheduled_payment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Scheduled payment {} not found", id)))?;

    let (original_name, data) = read_upload(&mut multipart).await?;
    let content_type = crate::services::storage::content_type_for(&original_name).to_string();
    let stored = state
        .store
        .upload(data, "comprobantes", &original_name, &content_type)
        .await?;

    let requires_rep = match payment.supplier_id {
        Some(supplier_id) => state
            .db
            .get_supplier(supplier_id)
            .await?
            .map(|s| s.requires_rep)
            .unwrap_or(false),
        None => false,
    };

    let voucher_status = if requires_rep {
        VoucherStatus::PendienteComplemento
    } else {
        VoucherStatus::CierreContable
    };
    let payment_status = if requires_rep {
        PaymentStatus::VoucherUploaded
    } else {
        PaymentStatus::PaymentCompleted
    };

    let voucher = state
        .db
        .create_voucher(&CreateVoucher {
            company_id: payment.company_id,
            payer_company_id: Some(payment.company_id),
            client_id: payment.supplier_id.unwrap_or(payment.company_id),
            client_name: payment.supplier_name.clone(),
            scheduled_payment_id: Some(payment.id),
            status: voucher_status,
            voucher_file_url: Some(stored.url.clone()),
            voucher_file_name: Some(original_name.clone()),
            voucher_file_type: Some(content_type),
            extracted_amount: Some(payment.amount),
            extracted_date: payment.payment_date,
            extracted_bank: None,
            extracted_reference: payment.reference.clone(),
            extracted_currency: Some(payment.currency.clone()),
            ocr_confidence: None,
            uploaded_by: Some(user.id),
        })
        .await?;

    let payment = state
        .db
        .mark_payment_paid(payment.id, payment_status, user.id, Some(voucher.id))
        .await?
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Scheduled payment {} vanished during voucher upload",
                id
            ))
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ConfirmPaymentResponse {
            scheduled_payment: payment,
            payment_voucher: VoucherResponse::from(voucher),
            message: if requires_rep {
                "Voucher uploaded; awaiting REP complement".to_string()
            } else {
                "Voucher uploaded; payment completed".to_string()
            },
        }),
    ))
}

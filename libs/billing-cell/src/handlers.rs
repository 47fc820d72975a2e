// libs/billing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::AppError;

use crate::models::{BillingError, CreateInvoiceRequest, InvoiceQuery, RecordPaymentRequest};
use crate::services::ledger::LedgerService;

fn map_error(e: BillingError) -> AppError {
    match e {
        BillingError::ValidationError(msg) => AppError::ValidationError(msg),
        BillingError::InvoiceNotFound => AppError::NotFound(e.to_string()),
        BillingError::ExceedsBalance { .. } => AppError::ExceedsBalance(e.to_string()),
        BillingError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
        BillingError::StorageUnavailable(msg) => AppError::StorageUnavailable(msg),
    }
}

#[axum::debug_handler]
pub async fn create_invoice(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<Json<Value>, AppError> {
    let invoice = service.create_invoice(request).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice,
        "message": "Invoice created"
    })))
}

#[axum::debug_handler]
pub async fn list_invoices(
    State(service): State<Arc<LedgerService>>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Value>, AppError> {
    let invoices = service.list_invoices(&query).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "count": invoices.len(),
        "invoices": invoices
    })))
}

#[axum::debug_handler]
pub async fn get_invoice(
    State(service): State<Arc<LedgerService>>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let invoice = service.get_invoice(invoice_id).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice
    })))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(service): State<Arc<LedgerService>>,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let invoice = service
        .record_payment(invoice_id, request)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice,
        "message": "Payment recorded"
    })))
}

#[axum::debug_handler]
pub async fn cancel_invoice(
    State(service): State<Arc<LedgerService>>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let invoice = service.cancel_invoice(invoice_id).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice
    })))
}

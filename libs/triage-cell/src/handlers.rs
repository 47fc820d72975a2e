// libs/triage-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::AppError;

use crate::models::{AdmitCaseRequest, CaseQuery, TriageError, UpdateCaseRequest};
use crate::services::queue::TriageService;

fn map_error(e: TriageError) -> AppError {
    match e {
        TriageError::ValidationError(msg) => AppError::ValidationError(msg),
        TriageError::CaseNotFound => AppError::NotFound(e.to_string()),
        TriageError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
        TriageError::StaleWrite => AppError::StaleWrite(e.to_string()),
        TriageError::StorageUnavailable(msg) => AppError::StorageUnavailable(msg),
    }
}

#[axum::debug_handler]
pub async fn admit_case(
    State(service): State<Arc<TriageService>>,
    Json(request): Json<AdmitCaseRequest>,
) -> Result<Json<Value>, AppError> {
    let case = service.admit(request).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case,
        "message": "Emergency case admitted"
    })))
}

#[axum::debug_handler]
pub async fn list_cases(
    State(service): State<Arc<TriageService>>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<Value>, AppError> {
    let cases = service.list(&query).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "count": cases.len(),
        "cases": cases
    })))
}

#[axum::debug_handler]
pub async fn get_case(
    State(service): State<Arc<TriageService>>,
    Path(case_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let case = service.get(case_id).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case
    })))
}

#[axum::debug_handler]
pub async fn update_case(
    State(service): State<Arc<TriageService>>,
    Path(case_id): Path<Uuid>,
    Json(request): Json<UpdateCaseRequest>,
) -> Result<Json<Value>, AppError> {
    let case = service.update_case(case_id, request).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "case": case
    })))
}

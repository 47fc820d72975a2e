// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::AppError;

use crate::models::{
    AppointmentQuery, BookAppointmentRequest, SchedulingError, SetAvailabilityRequest,
    TransitionAppointmentRequest,
};
use crate::services::booking::BookingService;

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

fn map_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::SlotConflict => AppError::Conflict(e.to_string()),
        SchedulingError::AppointmentNotFound | SchedulingError::AvailabilityNotFound(_) => {
            AppError::NotFound(e.to_string())
        }
        SchedulingError::InvalidInput(msg) => AppError::ValidationError(msg),
        SchedulingError::InvalidTransition { .. } | SchedulingError::NotAssignedDoctor => {
            AppError::InvalidTransition(e.to_string())
        }
        SchedulingError::StaleWrite => AppError::StaleWrite(e.to_string()),
        SchedulingError::StorageUnavailable(msg) => AppError::StorageUnavailable(msg),
    }
}

#[axum::debug_handler]
pub async fn list_free_slots(
    State(service): State<Arc<BookingService>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = service
        .list_free_slots(doctor_id, query.date)
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(service): State<Arc<BookingService>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.book(request).await.map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn transition_appointment(
    State(service): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service
        .transition(appointment_id, request)
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(service): State<Arc<BookingService>>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.search(&query).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(service): State<Arc<BookingService>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = service.get(appointment_id).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn set_availability(
    State(service): State<Arc<BookingService>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let availability = service
        .set_availability(doctor_id, request)
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(service): State<Arc<BookingService>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let availability = service.get_availability(doctor_id).map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

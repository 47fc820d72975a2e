// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::handlers;
use crate::services::booking::BookingService;

pub fn scheduling_routes(service: Arc<BookingService>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/", get(handlers::search_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/transition", patch(handlers::transition_appointment))
        .route("/doctors/{doctor_id}/slots", get(handlers::list_free_slots))
        .route("/doctors/{doctor_id}/availability", put(handlers::set_availability))
        .route("/doctors/{doctor_id}/availability", get(handlers::get_availability))
        .with_state(service)
}

// libs/triage-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::services::queue::TriageService;

pub fn triage_routes(service: Arc<TriageService>) -> Router {
    Router::new()
        .route("/", post(handlers::admit_case))
        .route("/", get(handlers::list_cases))
        .route("/{case_id}", get(handlers::get_case))
        .route("/{case_id}", patch(handlers::update_case))
        .with_state(service)
}

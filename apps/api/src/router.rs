use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use billing_cell::{billing_routes, LedgerService};
use scheduling_cell::{scheduling_routes, BookingService};
use shared_config::AppConfig;
use triage_cell::{triage_routes, TriageService};

pub fn create_router(
    config: Arc<AppConfig>,
    booking: Arc<BookingService>,
    triage: Arc<TriageService>,
    ledger: Arc<LedgerService>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital core API is running!" }))
        .route("/health", get(health).with_state(Arc::clone(&config)))
        .nest("/api/appointments", scheduling_routes(booking))
        .nest("/api/emergency", triage_routes(triage))
        .nest("/api/billing", billing_routes(ledger))
}

async fn health(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "triage_poll_seconds": config.triage_poll_seconds
    }))
}

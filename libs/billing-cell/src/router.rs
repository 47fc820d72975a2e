// libs/billing-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::services::ledger::LedgerService;

pub fn billing_routes(service: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/invoices", post(handlers::create_invoice))
        .route("/invoices", get(handlers::list_invoices))
        .route("/invoices/{invoice_id}", get(handlers::get_invoice))
        .route("/invoices/{invoice_id}/payments", patch(handlers::record_payment))
        .route("/invoices/{invoice_id}/cancel", patch(handlers::cancel_invoice))
        .with_state(service)
}

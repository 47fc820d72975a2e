pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::billing_routes;
pub use services::ledger::LedgerService;
pub use store::BillingStore;

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::triage_routes;
pub use services::queue::TriageService;
pub use store::TriageStore;

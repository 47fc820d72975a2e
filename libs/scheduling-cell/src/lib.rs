pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::scheduling_routes;
pub use services::booking::BookingService;
pub use store::SchedulingStore;

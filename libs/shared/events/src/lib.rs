pub mod bus;
pub mod models;
pub mod sink;

pub use bus::{spawn_dispatcher, EventBus};
pub use models::DomainEvent;
pub use sink::{LoggingSink, NotificationSink, RecordingSink};

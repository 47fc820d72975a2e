// libs/shared/events/src/sink.rs
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::models::DomainEvent;

/// Delivery seam for the external notification subsystem. Delivery is
/// at-least-once; a failing sink never rolls back the originating
/// operation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &DomainEvent) -> Result<()>;
}

/// Default sink: structured log line per event.
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, event: &DomainEvent) -> Result<()> {
        info!(kind = event.kind(), payload = ?event, "domain event");
        Ok(())
    }
}

/// Captures delivered events so tests can assert on emission.
pub struct RecordingSink {
    delivered: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<DomainEvent> {
        self.delivered.lock().expect("sink lock").clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, event: &DomainEvent) -> Result<()> {
        self.delivered.lock().expect("sink lock").push(event.clone());
        Ok(())
    }
}

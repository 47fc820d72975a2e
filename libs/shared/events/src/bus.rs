// libs/shared/events/src/bus.rs
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::DomainEvent;
use crate::sink::NotificationSink;

/// Fire-and-forget publisher for finalized state changes. Publishing never
/// blocks and never fails the emitting operation, even with the dispatcher
/// gone.
#[derive(Clone)]
pub struct EventBus {
    tx: UnboundedSender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> (Self, UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: DomainEvent) {
        debug!(kind = event.kind(), "publishing domain event");
        if self.tx.send(event).is_err() {
            warn!("event dispatcher is gone; dropping domain event");
        }
    }
}

/// Drains the bus into the notification sink on a background task. Sink
/// failures are logged and skipped.
pub fn spawn_dispatcher(
    mut rx: UnboundedReceiver<DomainEvent>,
    sink: Arc<dyn NotificationSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = sink.deliver(&event).await {
                warn!(kind = event.kind(), "notification delivery failed: {}", e);
            }
        }
        debug!("event bus closed, dispatcher stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn published_events_reach_the_sink_in_order() {
        let (bus, rx) = EventBus::new();
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = spawn_dispatcher(rx, Arc::clone(&sink) as Arc<dyn NotificationSink>);

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        bus.publish(DomainEvent::InvoiceCancelled {
            invoice_id: first,
            occurred_at: Utc::now(),
        });
        bus.publish(DomainEvent::InvoiceCancelled {
            invoice_id: second,
            occurred_at: Utc::now(),
        });

        drop(bus);
        dispatcher.await.unwrap();

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 2);
        assert!(
            matches!(&delivered[0], DomainEvent::InvoiceCancelled { invoice_id, .. } if *invoice_id == first)
        );
    }

    #[tokio::test]
    async fn publish_without_dispatcher_does_not_panic() {
        let (bus, rx) = EventBus::new();
        drop(rx);

        bus.publish(DomainEvent::InvoiceCancelled {
            invoice_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        });
    }
}

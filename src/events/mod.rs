use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Domain events emitted after a transaction commits. Consumed by the
/// in-process [`process_events`] loop for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderDeleted(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    WorkOrderCreated(Uuid),
    WorkOrderDeleted(Uuid),
    WorkOrderStatusChanged {
        work_order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    InventoryAdjusted {
        product_id: Uuid,
        quantity_change: i32,
        new_quantity: i32,
    },

    UserRegistered(Uuid),
    NotificationCreated {
        notification_id: Uuid,
        user_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {e}")))
    }
}

/// Build a channel pair; the receiver goes to [`process_events`].
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drain the event channel, logging each event with structured fields.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, old_status, new_status, "Order status changed");
            }
            Event::WorkOrderStatusChanged {
                work_order_id,
                old_status,
                new_status,
            } => {
                info!(%work_order_id, old_status, new_status, "Work order status changed");
            }
            Event::InventoryAdjusted {
                product_id,
                quantity_change,
                new_quantity,
            } => {
                info!(%product_id, quantity_change, new_quantity, "Inventory adjusted");
            }
            other => info!(event = ?other, "Event received"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (sender, mut rx) = channel(8);
        let id = Uuid::new_v4();
        sender.send(Event::OrderCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (sender, rx) = channel(1);
        drop(rx);
        let err = sender.send(Event::OrderDeleted(Uuid::new_v4())).await;
        assert!(err.is_err());
    }
}

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Domain events emitted by the services. Consumed in-process by a logging
/// worker; there is no external queue behind this channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartItemAdded { cart_id: Uuid, variant_id: Uuid },
    CartItemUpdated { cart_id: Uuid, item_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Payment events
    PaymentSucceeded { order_id: Uuid, payment_id: Uuid },
    PaymentFailed { order_id: Uuid, payment_id: Uuid },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    VariantStockAdjusted { variant_id: Uuid, stock_count: i32 },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is
    /// closed. Event delivery is best-effort and never blocks a request
    /// from completing.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Drains the event channel and logs each event. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        debug!(?event, "domain event");
    }
    debug!("event channel closed; event processor exiting");
}

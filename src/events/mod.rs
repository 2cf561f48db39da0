use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::PaymentMethod;

pub mod listeners;

/// Payload handed to order-completed listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order_id: Uuid,
    pub order_total: Decimal,
    pub customer_email: Option<String>,
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Container events
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CartCleared(Uuid),
    WishlistCreated(Uuid),
    WishlistUpdated(Uuid),
    WishlistCleared(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderShippingAddressSet(Uuid),
    OrderCompleted(OrderCompletedEvent),

    // Payment events
    PaymentCreated {
        order_id: Uuid,
        method: PaymentMethod,
    },
    PaymentCaptured(Uuid),
    PaymentFailed(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::CartCreated(_) => "cart_created",
            Event::CartUpdated(_) => "cart_updated",
            Event::CartCleared(_) => "cart_cleared",
            Event::WishlistCreated(_) => "wishlist_created",
            Event::WishlistUpdated(_) => "wishlist_updated",
            Event::WishlistCleared(_) => "wishlist_cleared",
            Event::OrderCreated(_) => "order_created",
            Event::OrderShippingAddressSet(_) => "order_shipping_address_set",
            Event::OrderCompleted(_) => "order_completed",
            Event::PaymentCreated { .. } => "payment_created",
            Event::PaymentCaptured(_) => "payment_captured",
            Event::PaymentFailed(_) => "payment_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
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

    /// Sends an event, logging instead of failing when the bus is gone.
    /// Callers publish after their transaction has committed.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, "{}", e);
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

// Handlers implementing this trait will process events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Retry settings applied to each handler independently.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Distributes incoming events to every registered handler until the channel closes.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    handlers: Vec<Arc<dyn EventHandler>>,
    policy: RetryPolicy,
) {
    info!(handlers = handlers.len(), "Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(event = event.name(), "Received event");
        dispatch(&event, &handlers, policy).await;
    }

    info!("Event channel closed, stopping event processing loop");
}

/// Runs every handler for one event; a failing handler does not affect the others.
pub async fn dispatch(event: &Event, handlers: &[Arc<dyn EventHandler>], policy: RetryPolicy) {
    join_all(
        handlers
            .iter()
            .map(|handler| handle_with_retry(handler.as_ref(), event, policy)),
    )
    .await;
}

async fn handle_with_retry(handler: &dyn EventHandler, event: &Event, policy: RetryPolicy) -> bool {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match handler.handle_event(event).await {
            Ok(()) => return true,
            Err(e) if attempt < attempts => {
                warn!(
                    handler = handler.name(),
                    event = event.name(),
                    attempt,
                    "Event handler failed, retrying: {}",
                    e
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(e) => {
                error!(
                    handler = handler.name(),
                    event = event.name(),
                    attempts,
                    "Event handler gave up: {}",
                    e
                );
            }
        }
    }
    false
}

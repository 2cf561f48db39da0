//! Order-completed listeners. Each runs outside the payment transaction.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{Event, EventHandler, OrderCompletedEvent};
use crate::entities::{order_item, product};

/// Decrements catalog stock by the quantities of a completed order.
pub struct InventoryDecrementListener {
    db: Arc<DatabaseConnection>,
}

impl InventoryDecrementListener {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, completed), fields(order_id = %completed.order_id))]
    async fn decrement(&self, completed: &OrderCompletedEvent) -> Result<(), String> {
        let txn = self.db.begin().await.map_err(|e| e.to_string())?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(completed.order_id))
            .all(&txn)
            .await
            .map_err(|e| e.to_string())?;

        for item in items {
            let Some(found) = product::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(|e| e.to_string())?
            else {
                continue;
            };
            let remaining = (found.quantity - item.quantity).max(0);
            let mut active: product::ActiveModel = found.into();
            active.quantity = Set(remaining);
            active.updated_at = Set(chrono::Utc::now());
            active.update(&txn).await.map_err(|e| e.to_string())?;
        }

        txn.commit().await.map_err(|e| e.to_string())?;
        info!("Inventory decremented for completed order");
        Ok(())
    }
}

#[async_trait]
impl EventHandler for InventoryDecrementListener {
    fn name(&self) -> &'static str {
        "inventory_decrement"
    }

    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        match event {
            Event::OrderCompleted(completed) => self.decrement(completed).await,
            _ => Ok(()),
        }
    }
}

/// Outbound mail sink.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// Mailer that only writes the message to the log.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        info!(to, subject, body, "Sending email");
        Ok(())
    }
}

/// Sends the order confirmation message.
pub struct OrderConfirmationListener {
    mailer: Arc<dyn Mailer>,
}

impl OrderConfirmationListener {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl EventHandler for OrderConfirmationListener {
    fn name(&self) -> &'static str {
        "order_confirmation"
    }

    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        let Event::OrderCompleted(completed) = event else {
            return Ok(());
        };
        let Some(email) = completed.customer_email.as_deref() else {
            info!(order_id = %completed.order_id, "No customer email, skipping confirmation");
            return Ok(());
        };

        let subject = format!("Your order {} is confirmed", completed.order_id);
        let body = format!(
            "Thank you for your purchase. Order total: {}",
            completed.order_total
        );
        self.mailer.send(email, &subject, &body).await
    }
}

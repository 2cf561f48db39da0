use crate::{
    config::AppConfig,
    entities::{commerce::cart_item, order, order_item, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{catalog::ProductCatalog, orders::OrderDetail, stock},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::container::{require_non_empty, CartKind, ContainerKind};

/// Converts a user's cart into a PENDING order.
#[derive(Clone)]
pub struct CheckoutAssembler {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutAssembler {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Creates an order from the user's cart.
    ///
    /// Stock for every line is re-checked first; any shortfall aborts the
    /// whole checkout with all offending lines. Prices come from the cart's
    /// snapshots. The cart is left untouched.
    #[instrument(skip(self))]
    pub async fn create_order_from_cart(&self, user_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = CartKind::find_by_user(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::EmptyContainer("cart has no items".to_string()))?;
        let lines = CartKind::items(&txn, cart.id).await?;
        require_non_empty(&lines, "cart")?;

        let mut shortfalls = Vec::new();
        for line in &lines {
            let product = ProductCatalog::get_active_product_with(&txn, line.product_id).await?;
            if let Some(warning) = stock::evaluate(&product, line.quantity) {
                shortfalls.push(warning);
            }
        }
        if !shortfalls.is_empty() {
            warn!(
                cart_id = %cart.id,
                lines = shortfalls.len(),
                "Checkout rejected for insufficient stock"
            );
            return Err(ServiceError::InsufficientStock(shortfalls));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let (items, total) = snapshot_lines(order_id, &lines);

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            order_total: Set(Some(total)),
            currency: Set(self.config.default_currency.clone()),
            shipping_recipient: Set(None),
            shipping_line1: Set(None),
            shipping_line2: Set(None),
            shipping_city: Set(None),
            shipping_region: Set(None),
            shipping_postal_code: Set(None),
            shipping_country: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            let saved_item = order_item::ActiveModel {
                id: Set(item.id),
                order_id: Set(item.order_id),
                position: Set(item.position),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(item.line_total),
            }
            .insert(&txn)
            .await?;
            saved.push(saved_item);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!(
            "Created order {} from cart {} with {} item(s), total {}",
            order_id,
            cart.id,
            saved.len(),
            total
        );
        Ok(OrderDetail {
            order,
            items: saved,
        })
    }
}

/// Copies cart lines into order items and sums the order total.
pub fn snapshot_lines(
    order_id: Uuid,
    lines: &[cart_item::Model],
) -> (Vec<order_item::Model>, Decimal) {
    let items: Vec<order_item::Model> = lines
        .iter()
        .enumerate()
        .map(|(position, line)| order_item::Model {
            id: Uuid::new_v4(),
            order_id,
            position: position as i32,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.price_snapshot,
            line_total: line.price_snapshot * Decimal::from(line.quantity),
        })
        .collect();
    let total = items.iter().map(|i| i.line_total).sum();
    (items, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn cart_line(quantity: i32, price: Decimal) -> cart_item::Model {
        let now = Utc::now();
        cart_item::Model {
            cart_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            quantity,
            price_snapshot: price,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn single_line_total() {
        let (items, total) = snapshot_lines(Uuid::new_v4(), &[cart_line(2, dec!(50.00))]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, dec!(50.00));
        assert_eq!(total, dec!(100.00));
    }

    #[test]
    fn positions_follow_cart_order() {
        let lines = vec![cart_line(1, dec!(1.00)), cart_line(1, dec!(2.00))];
        let (items, _) = snapshot_lines(Uuid::new_v4(), &lines);
        assert_eq!(items[0].position, 0);
        assert_eq!(items[1].position, 1);
        assert_eq!(items[1].product_id, lines[1].product_id);
    }

    proptest! {
        #[test]
        fn total_equals_sum_of_lines(
            lines in proptest::collection::vec((1i32..50, 0u32..100_000), 1..12)
        ) {
            let cart: Vec<cart_item::Model> = lines
                .iter()
                .map(|(q, cents)| cart_line(*q, Decimal::new(i64::from(*cents), 2)))
                .collect();
            let (items, total) = snapshot_lines(Uuid::new_v4(), &cart);
            let expected: Decimal = items
                .iter()
                .map(|i| i.unit_price * Decimal::from(i.quantity))
                .sum();
            prop_assert_eq!(total, expected);
            prop_assert_eq!(items.len(), cart.len());
        }
    }
}

//! Order queries, shipping address assignment and status transitions.

pub mod state_machine;

use crate::{
    entities::{order, order_item, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::users::{ShippingAddress, UserDirectory},
};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

pub use state_machine::{ensure_shipping_address_assignable, ensure_transition, is_valid_transition};

/// An order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Explicit shipping address. Leave every field empty to use the user's default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ShippingAddressInput {
    #[validate(length(max = 200))]
    pub recipient: Option<String>,
    #[validate(length(max = 200))]
    pub line1: Option<String>,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(min = 2, max = 2))]
    pub country: Option<String>,
}

impl From<ShippingAddressInput> for ShippingAddress {
    fn from(input: ShippingAddressInput) -> Self {
        Self {
            recipient: input.recipient,
            line1: input.line1,
            line2: input.line2,
            city: input.city,
            region: input.region,
            postal_code: input.postal_code,
            country: input.country,
        }
    }
}

/// Loads an order, rejecting access to another user's order as `Unauthorized`.
pub async fn load_owned_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    if order.user_id != user_id {
        return Err(ServiceError::Unauthorized(format!(
            "Order {} belongs to another user",
            order_id
        )));
    }
    Ok(order)
}

/// Writes `changes` guarded by the version read into `order`, then returns the fresh row.
///
/// A concurrent writer that bumped the version first yields `ConcurrentModification`.
pub async fn update_versioned<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
    mut changes: order::ActiveModel,
) -> Result<order::Model, ServiceError> {
    changes.version = Set(order.version + 1);
    changes.updated_at = Set(Utc::now());

    let result = order::Entity::update_many()
        .set(changes)
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Version.eq(order.version))
        .exec(conn)
        .await?;
    if result.rows_affected != 1 {
        return Err(ServiceError::ConcurrentModification(order.id));
    }

    order::Entity::find_by_id(order.id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order.id)))
}

/// Moves `order` to `to` if the state machine allows it.
pub async fn transition_status<C: ConnectionTrait>(
    conn: &C,
    order: &order::Model,
    to: OrderStatus,
) -> Result<order::Model, ServiceError> {
    ensure_transition(order, to)?;
    update_versioned(
        conn,
        order,
        order::ActiveModel {
            status: Set(to),
            ..Default::default()
        },
    )
    .await
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = load_owned_order(self.db.as_ref(), user_id, order_id).await?;
        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::Position)
            .all(self.db.as_ref())
            .await?;
        Ok(OrderDetail { order, items })
    }

    /// The user's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(self.db.as_ref())
            .await?)
    }

    /// Attaches a shipping address to a PENDING order that has none.
    ///
    /// With no explicit address the user's stored default is used.
    #[instrument(skip(self, input))]
    pub async fn set_shipping_address(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: Option<ShippingAddressInput>,
    ) -> Result<order::Model, ServiceError> {
        if let Some(input) = &input {
            input.validate()?;
        }

        let txn = self.db.begin().await?;
        let order = load_owned_order(&txn, user_id, order_id).await?;
        ensure_shipping_address_assignable(&order)?;

        let explicit = input.map(ShippingAddress::from).filter(|a| !a.is_empty());
        let address = match explicit {
            Some(address) => address,
            None => UserDirectory::default_shipping_address(&txn, user_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidOperation(
                        "No shipping address given and none on file".to_string(),
                    )
                })?,
        };

        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Shipping address is missing: {}",
                missing.join(", ")
            )));
        }

        let updated = update_versioned(
            &txn,
            &order,
            order::ActiveModel {
                shipping_recipient: Set(address.recipient),
                shipping_line1: Set(address.line1),
                shipping_line2: Set(address.line2),
                shipping_city: Set(address.city),
                shipping_region: Set(address.region),
                shipping_postal_code: Set(address.postal_code),
                shipping_country: Set(address.country),
                ..Default::default()
            },
        )
        .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderShippingAddressSet(order_id))
            .await;

        info!("Set shipping address on order {}", order_id);
        Ok(updated)
    }
}

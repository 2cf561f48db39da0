use crate::{
    config::AppConfig,
    entities::commerce::{cart, cart_item, wishlist, wishlist_item},
    entities::product,
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::ProductCatalog,
    services::stock::StockWarning,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::snapshot::{self, LineItem, RequestedLine};

/// Storage-agnostic identity of a per-user container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContainerHeader {
    fn fresh(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Persistence operations a container kind (cart, wishlist) supplies to
/// [`ContainerService`].
#[async_trait]
pub trait ContainerKind: Send + Sync + 'static {
    type Item: LineItem + Clone + Send + Sync;

    /// Lowercase name used in messages, e.g. `cart`
    const NAME: &'static str;

    async fn find_by_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<ContainerHeader>, DbErr>;

    async fn insert<C: ConnectionTrait>(conn: &C, header: &ContainerHeader) -> Result<(), DbErr>;

    async fn touch<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;

    async fn items<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
    ) -> Result<Vec<Self::Item>, DbErr>;

    fn new_item(
        container_id: Uuid,
        product: &product::Model,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Self::Item;

    async fn insert_item<C: ConnectionTrait>(conn: &C, item: &Self::Item) -> Result<(), DbErr>;

    /// Inserts `item`, or adds its quantity to the existing line for the same
    /// product in one statement. The existing price snapshot is kept.
    async fn upsert_add<C: ConnectionTrait>(conn: &C, item: &Self::Item) -> Result<(), DbErr>;

    async fn update_quantity<C: ConnectionTrait>(
        conn: &C,
        item: &Self::Item,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr>;

    async fn delete_item<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
        product_id: Uuid,
    ) -> Result<u64, DbErr>;

    async fn delete_all<C: ConnectionTrait>(conn: &C, container_id: Uuid) -> Result<u64, DbErr>;

    fn created_event(container_id: Uuid) -> Event;
    fn updated_event(container_id: Uuid) -> Event;
    fn cleared_event(container_id: Uuid) -> Event;
}

impl LineItem for cart_item::Model {
    fn product_id(&self) -> Uuid {
        self.product_id
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn price_snapshot(&self) -> Decimal {
        self.price_snapshot
    }
    fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
    }
}

impl LineItem for wishlist_item::Model {
    fn product_id(&self) -> Uuid {
        self.product_id
    }
    fn quantity(&self) -> i32 {
        self.quantity
    }
    fn price_snapshot(&self) -> Decimal {
        self.price_snapshot
    }
    fn set_quantity(&mut self, quantity: i32) {
        self.quantity = quantity;
    }
}

pub struct CartKind;

#[async_trait]
impl ContainerKind for CartKind {
    type Item = cart_item::Model;

    const NAME: &'static str = "cart";

    async fn find_by_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<ContainerHeader>, DbErr> {
        Ok(cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .map(|c| ContainerHeader {
                id: c.id,
                user_id: c.user_id,
                created_at: c.created_at,
                updated_at: c.updated_at,
            }))
    }

    async fn insert<C: ConnectionTrait>(conn: &C, header: &ContainerHeader) -> Result<(), DbErr> {
        cart::ActiveModel {
            id: Set(header.id),
            user_id: Set(header.user_id),
            created_at: Set(header.created_at),
            updated_at: Set(header.updated_at),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    async fn touch<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        cart::Entity::update_many()
            .set(cart::ActiveModel {
                updated_at: Set(at),
                ..Default::default()
            })
            .filter(cart::Column::Id.eq(container_id))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn items<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
    ) -> Result<Vec<Self::Item>, DbErr> {
        cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(container_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .order_by_asc(cart_item::Column::ProductId)
            .all(conn)
            .await
    }

    fn new_item(
        container_id: Uuid,
        product: &product::Model,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Self::Item {
        cart_item::Model {
            cart_id: container_id,
            product_id: product.id,
            quantity,
            price_snapshot: product.price,
            created_at: at,
            updated_at: at,
        }
    }

    async fn insert_item<C: ConnectionTrait>(conn: &C, item: &Self::Item) -> Result<(), DbErr> {
        cart_item::ActiveModel {
            cart_id: Set(item.cart_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price_snapshot: Set(item.price_snapshot),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    async fn upsert_add<C: ConnectionTrait>(conn: &C, item: &Self::Item) -> Result<(), DbErr> {
        cart_item::Entity::insert(cart_item::ActiveModel {
            cart_id: Set(item.cart_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price_snapshot: Set(item.price_snapshot),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        })
        .on_conflict(
            OnConflict::columns([cart_item::Column::CartId, cart_item::Column::ProductId])
                .value(
                    cart_item::Column::Quantity,
                    Expr::col((cart_item::Entity, cart_item::Column::Quantity)).add(item.quantity),
                )
                .update_column(cart_item::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
        Ok(())
    }

    async fn update_quantity<C: ConnectionTrait>(
        conn: &C,
        item: &Self::Item,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let mut active: cart_item::ActiveModel = item.clone().into();
        active.quantity = Set(quantity);
        active.updated_at = Set(at);
        active.update(conn).await?;
        Ok(())
    }

    async fn delete_item<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
        product_id: Uuid,
    ) -> Result<u64, DbErr> {
        Ok(cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(container_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?
            .rows_affected)
    }

    async fn delete_all<C: ConnectionTrait>(conn: &C, container_id: Uuid) -> Result<u64, DbErr> {
        Ok(cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(container_id))
            .exec(conn)
            .await?
            .rows_affected)
    }

    fn created_event(container_id: Uuid) -> Event {
        Event::CartCreated(container_id)
    }
    fn updated_event(container_id: Uuid) -> Event {
        Event::CartUpdated(container_id)
    }
    fn cleared_event(container_id: Uuid) -> Event {
        Event::CartCleared(container_id)
    }
}

pub struct WishlistKind;

#[async_trait]
impl ContainerKind for WishlistKind {
    type Item = wishlist_item::Model;

    const NAME: &'static str = "wishlist";

    async fn find_by_user<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<ContainerHeader>, DbErr> {
        Ok(wishlist::Entity::find()
            .filter(wishlist::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .map(|w| ContainerHeader {
                id: w.id,
                user_id: w.user_id,
                created_at: w.created_at,
                updated_at: w.updated_at,
            }))
    }

    async fn insert<C: ConnectionTrait>(conn: &C, header: &ContainerHeader) -> Result<(), DbErr> {
        wishlist::ActiveModel {
            id: Set(header.id),
            user_id: Set(header.user_id),
            created_at: Set(header.created_at),
            updated_at: Set(header.updated_at),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    async fn touch<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        wishlist::Entity::update_many()
            .set(wishlist::ActiveModel {
                updated_at: Set(at),
                ..Default::default()
            })
            .filter(wishlist::Column::Id.eq(container_id))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn items<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
    ) -> Result<Vec<Self::Item>, DbErr> {
        wishlist_item::Entity::find()
            .filter(wishlist_item::Column::WishlistId.eq(container_id))
            .order_by_asc(wishlist_item::Column::CreatedAt)
            .order_by_asc(wishlist_item::Column::ProductId)
            .all(conn)
            .await
    }

    fn new_item(
        container_id: Uuid,
        product: &product::Model,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Self::Item {
        wishlist_item::Model {
            wishlist_id: container_id,
            product_id: product.id,
            quantity,
            price_snapshot: product.price,
            created_at: at,
            updated_at: at,
        }
    }

    async fn insert_item<C: ConnectionTrait>(conn: &C, item: &Self::Item) -> Result<(), DbErr> {
        wishlist_item::ActiveModel {
            wishlist_id: Set(item.wishlist_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price_snapshot: Set(item.price_snapshot),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    async fn upsert_add<C: ConnectionTrait>(conn: &C, item: &Self::Item) -> Result<(), DbErr> {
        wishlist_item::Entity::insert(wishlist_item::ActiveModel {
            wishlist_id: Set(item.wishlist_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price_snapshot: Set(item.price_snapshot),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        })
        .on_conflict(
            OnConflict::columns([wishlist_item::Column::WishlistId, wishlist_item::Column::ProductId])
                .value(
                    wishlist_item::Column::Quantity,
                    Expr::col((wishlist_item::Entity, wishlist_item::Column::Quantity)).add(item.quantity),
                )
                .update_column(wishlist_item::Column::UpdatedAt)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
        Ok(())
    }

    async fn update_quantity<C: ConnectionTrait>(
        conn: &C,
        item: &Self::Item,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let mut active: wishlist_item::ActiveModel = item.clone().into();
        active.quantity = Set(quantity);
        active.updated_at = Set(at);
        active.update(conn).await?;
        Ok(())
    }

    async fn delete_item<C: ConnectionTrait>(
        conn: &C,
        container_id: Uuid,
        product_id: Uuid,
    ) -> Result<u64, DbErr> {
        Ok(wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(container_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?
            .rows_affected)
    }

    async fn delete_all<C: ConnectionTrait>(conn: &C, container_id: Uuid) -> Result<u64, DbErr> {
        Ok(wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::WishlistId.eq(container_id))
            .exec(conn)
            .await?
            .rows_affected)
    }

    fn created_event(container_id: Uuid) -> Event {
        Event::WishlistCreated(container_id)
    }
    fn updated_event(container_id: Uuid) -> Event {
        Event::WishlistUpdated(container_id)
    }
    fn cleared_event(container_id: Uuid) -> Event {
        Event::WishlistCleared(container_id)
    }
}

/// One line of a container as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_snapshot: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<ContainerLine>,
    pub total_quantity: i64,
    pub subtotal: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl ContainerView {
    fn build<L: LineItem>(header: &ContainerHeader, items: &[L]) -> Self {
        let items: Vec<ContainerLine> = items
            .iter()
            .map(|l| ContainerLine {
                product_id: l.product_id(),
                quantity: l.quantity(),
                price_snapshot: l.price_snapshot(),
                line_total: l.price_snapshot() * Decimal::from(l.quantity()),
            })
            .collect();
        Self {
            id: header.id,
            user_id: header.user_id,
            total_quantity: items.iter().map(|l| i64::from(l.quantity)).sum(),
            subtotal: items.iter().map(|l| l.line_total).sum(),
            items,
            updated_at: header.updated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of a snapshot sync: the merged container plus advisory warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub container: ContainerView,
    pub warnings: Vec<StockWarning>,
}

/// Fails with `EmptyContainer` when there is nothing to check out.
pub fn require_non_empty<L>(items: &[L], what: &str) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::EmptyContainer(format!("{} has no items", what)));
    }
    Ok(())
}

/// Per-user container service, shared by carts and wishlists.
///
/// Provides:
/// - Lazy get-or-create, safe against concurrent first access
/// - Cumulative single-item add
/// - Full-replacement snapshot sync with advisory stock warnings
/// - Single-line removal and clear
///
/// Every mutation runs in one database transaction.
pub struct ContainerService<K: ContainerKind> {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    _kind: PhantomData<K>,
}

impl<K: ContainerKind> Clone for ContainerService<K> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            event_sender: self.event_sender.clone(),
            config: self.config.clone(),
            _kind: PhantomData,
        }
    }
}

pub type CartService = ContainerService<CartKind>;
pub type WishlistService = ContainerService<WishlistKind>;

impl<K: ContainerKind> ContainerService<K> {
    /// Creates a new container service.
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    /// * `event_sender` - Event sender for publishing container events
    /// * `config` - Application configuration (quantity limits)
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            _kind: PhantomData,
        }
    }

    /// Returns the user's container, creating an empty one on first access.
    ///
    /// Relies on the unique `user_id` key: when a concurrent request wins the
    /// insert, the existing row is read back instead.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<ContainerHeader, ServiceError> {
        if let Some(header) = K::find_by_user(self.db.as_ref(), user_id).await? {
            return Ok(header);
        }

        let header = ContainerHeader::fresh(user_id);
        match K::insert(self.db.as_ref(), &header).await {
            Ok(()) => {
                self.event_sender
                    .send_or_log(K::created_event(header.id))
                    .await;
                info!("Created {} {} for user {}", K::NAME, header.id, user_id);
                Ok(header)
            }
            Err(e) if ServiceError::is_unique_violation(&e) => {
                info!("Concurrent {} creation for user {}, re-reading", K::NAME, user_id);
                K::find_by_user(self.db.as_ref(), user_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "{} for user {} vanished after conflict",
                            K::NAME,
                            user_id
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the user's container with its lines.
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: Uuid) -> Result<ContainerView, ServiceError> {
        let header = self.get_or_create(user_id).await?;
        let items = K::items(self.db.as_ref(), header.id).await?;
        Ok(ContainerView::build(&header, &items))
    }

    /// Adds `quantity` units of a product, incrementing an existing line.
    ///
    /// # Errors
    ///
    /// * `ServiceError::ValidationError` - quantity or resulting line quantity out of range
    /// * `ServiceError::NotFound` - product missing or soft-deleted
    #[instrument(skip(self))]
    pub async fn add_or_increment(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<ContainerView, ServiceError> {
        self.validate_quantity(quantity)?;
        let header = self.get_or_create(user_id).await?;
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let product = ProductCatalog::get_active_product_with(&txn, product_id).await?;
        // Single-statement increment: concurrent adds of one product accumulate.
        K::upsert_add(&txn, &K::new_item(header.id, &product, quantity, now)).await?;

        let items = K::items(&txn, header.id).await?;
        if let Some(line) = items.iter().find(|item| item.product_id() == product_id) {
            // Rolls the increment back when the line would exceed the limit.
            self.validate_quantity(line.quantity())?;
        }
        K::touch(&txn, header.id, now).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(K::updated_event(header.id))
            .await;

        info!(
            "Added {} x {} to {} {}",
            quantity,
            product_id,
            K::NAME,
            header.id
        );
        Ok(ContainerView::build(
            &ContainerHeader {
                updated_at: now,
                ..header
            },
            &items,
        ))
    }

    /// Replaces the container contents with `requested`.
    ///
    /// Products missing from the request are removed. Lines that would
    /// exceed available stock are skipped and reported as warnings while the
    /// rest of the request is applied.
    #[instrument(skip(self, requested), fields(lines = requested.len()))]
    pub async fn sync_snapshot(
        &self,
        user_id: Uuid,
        requested: Vec<RequestedLine>,
    ) -> Result<SyncOutcome, ServiceError> {
        for line in &requested {
            self.validate_quantity(line.quantity)?;
        }
        let header = self.get_or_create(user_id).await?;
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let ids: Vec<Uuid> = {
            let mut seen = HashSet::new();
            requested
                .iter()
                .map(|r| r.product_id)
                .filter(|id| seen.insert(*id))
                .collect()
        };
        let products = ProductCatalog::get_active_products_with(&txn, &ids).await?;

        let existing = K::items(&txn, header.id).await?;
        let before: HashMap<Uuid, K::Item> = existing
            .iter()
            .map(|item| (item.product_id(), item.clone()))
            .collect();

        let container_id = header.id;
        let outcome = snapshot::merge(existing, &requested, &products, |product, quantity| {
            K::new_item(container_id, product, quantity, now)
        });

        let kept: HashSet<Uuid> = outcome.items.iter().map(|i| i.product_id()).collect();
        for product_id in before.keys().filter(|id| !kept.contains(id)) {
            K::delete_item(&txn, container_id, *product_id).await?;
        }
        for item in &outcome.items {
            match before.get(&item.product_id()) {
                Some(previous) if previous.quantity() != item.quantity() => {
                    K::update_quantity(&txn, previous, item.quantity(), now).await?;
                }
                Some(_) => {}
                None => K::insert_item(&txn, item).await?,
            }
        }
        K::touch(&txn, container_id, now).await?;

        let items = K::items(&txn, container_id).await?;
        txn.commit().await?;

        for warning in &outcome.warnings {
            warn!(
                product_id = %warning.product_id,
                kind = ?warning.kind,
                "Skipped {} line during sync",
                K::NAME
            );
        }
        self.event_sender
            .send_or_log(K::updated_event(container_id))
            .await;

        info!(
            "Synced {} {}: {} line(s), {} warning(s)",
            K::NAME,
            container_id,
            items.len(),
            outcome.warnings.len()
        );
        Ok(SyncOutcome {
            container: ContainerView::build(
                &ContainerHeader {
                    updated_at: now,
                    ..header
                },
                &items,
            ),
            warnings: outcome.warnings,
        })
    }

    /// Removes a single line. Removing an absent product is a no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<ContainerView, ServiceError> {
        let header = self.get_or_create(user_id).await?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let removed = K::delete_item(&txn, header.id, product_id).await?;
        if removed > 0 {
            K::touch(&txn, header.id, now).await?;
        }
        let items = K::items(&txn, header.id).await?;
        txn.commit().await?;

        if removed > 0 {
            self.event_sender
                .send_or_log(K::updated_event(header.id))
                .await;
            info!("Removed {} from {} {}", product_id, K::NAME, header.id);
        }
        Ok(ContainerView::build(&header, &items))
    }

    /// Empties the container. Idempotent.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<ContainerView, ServiceError> {
        let header = self.get_or_create(user_id).await?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let removed = K::delete_all(&txn, header.id).await?;
        K::touch(&txn, header.id, now).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(K::cleared_event(header.id))
            .await;

        info!("Cleared {} {} ({} line(s))", K::NAME, header.id, removed);
        Ok(ContainerView::build::<K::Item>(
            &ContainerHeader {
                updated_at: now,
                ..header
            },
            &[],
        ))
    }

    fn validate_quantity(&self, quantity: i32) -> Result<(), ServiceError> {
        let max = self.config.max_line_quantity;
        if quantity < 1 || quantity > max {
            return Err(ServiceError::ValidationError(format!(
                "quantity must be between 1 and {}, got {}",
                max, quantity
            )));
        }
        Ok(())
    }
}

//! Transaction-row bookkeeping shared by every payment strategy.

use crate::{
    entities::{order, payment_transaction, PaymentMethod, TransactionStatus},
    errors::ServiceError,
    events::{Event, EventSender, OrderCompletedEvent},
    services::{orders::load_owned_order, users::UserDirectory},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::processor::RemoteOrder;
use super::validation::{PaymentAttempt, PaymentValidationChain};

/// An open unit of work for a payment step, with the order and its
/// current transaction read inside it.
pub struct OpenAttempt {
    pub txn: DatabaseTransaction,
    pub order: order::Model,
    pub transaction: Option<payment_transaction::Model>,
}

/// Order and payment row read outside a transaction.
pub struct PaymentSnapshot {
    pub order: order::Model,
    pub transaction: Option<payment_transaction::Model>,
}

pub struct PaymentLedger {
    db: Arc<DatabaseConnection>,
    chain: PaymentValidationChain,
    event_sender: Arc<EventSender>,
    users: Arc<UserDirectory>,
}

impl PaymentLedger {
    pub fn new(
        db: Arc<DatabaseConnection>,
        chain: PaymentValidationChain,
        event_sender: Arc<EventSender>,
        users: Arc<UserDirectory>,
    ) -> Self {
        Self {
            db,
            chain,
            event_sender,
            users,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    pub async fn find_transaction<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> Result<Option<payment_transaction::Model>, ServiceError> {
        Ok(payment_transaction::Entity::find()
            .filter(payment_transaction::Column::OrderId.eq(order_id))
            .one(conn)
            .await?)
    }

    /// Reads the caller's order and payment row without holding a transaction.
    ///
    /// Used ahead of processor round-trips; the write path re-reads through
    /// [`reopen`](Self::reopen).
    pub async fn snapshot(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentSnapshot, ServiceError> {
        let order = load_owned_order(self.db.as_ref(), user_id, order_id).await?;
        let transaction = Self::find_transaction(self.db.as_ref(), order_id).await?;
        Ok(PaymentSnapshot { order, transaction })
    }

    pub fn validate(
        &self,
        order: &order::Model,
        transaction: Option<&payment_transaction::Model>,
    ) -> Result<(), ServiceError> {
        self.chain.validate(&PaymentAttempt { order, transaction })
    }

    /// Begins a transaction and re-reads `seen`. Fails with `Conflict` when
    /// the order was written after `seen` was read.
    pub async fn reopen(&self, seen: &order::Model) -> Result<OpenAttempt, ServiceError> {
        let attempt = self.open(seen.user_id, seen.id).await?;
        if attempt.order.version != seen.version {
            return Err(ServiceError::Conflict(format!(
                "Order {} changed while its payment was in flight",
                seen.id
            )));
        }
        Ok(attempt)
    }

    /// Begins a transaction and loads the caller's order with its payment row.
    pub async fn open(&self, user_id: Uuid, order_id: Uuid) -> Result<OpenAttempt, ServiceError> {
        let txn = self.db.begin().await?;
        let order = load_owned_order(&txn, user_id, order_id).await?;
        let transaction = Self::find_transaction(&txn, order_id).await?;
        Ok(OpenAttempt {
            txn,
            order,
            transaction,
        })
    }

    /// Like [`open`](Self::open), then runs the validation chain on what was read.
    pub async fn begin_attempt(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OpenAttempt, ServiceError> {
        let attempt = self.open(user_id, order_id).await?;
        self.validate(&attempt.order, attempt.transaction.as_ref())?;
        Ok(attempt)
    }

    /// Records a PENDING transaction for `order`.
    ///
    /// An earlier pending or canceled row is reused, since an order owns at
    /// most one transaction row. A concurrent insert losing the unique
    /// `order_id` race surfaces as `Conflict`.
    pub async fn open_pending<C: ConnectionTrait>(
        conn: &C,
        order: &order::Model,
        previous: Option<payment_transaction::Model>,
        method: PaymentMethod,
        remote: Option<&RemoteOrder>,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let amount = order
            .order_total
            .ok_or(ServiceError::InvalidOrderTotal(order.id))?;
        let now = Utc::now();
        let external_id = remote.map(|r| r.external_id.clone());
        let approval_url = remote.and_then(|r| r.approval_url.clone());

        match previous {
            Some(existing) if existing.is_completed() => {
                Err(ServiceError::PaymentAlreadyCompleted(order.id))
            }
            Some(existing) => {
                let mut active: payment_transaction::ActiveModel = existing.into();
                active.method = Set(method);
                active.status = Set(TransactionStatus::Pending);
                active.amount = Set(amount);
                active.currency = Set(order.currency.clone());
                active.external_id = Set(external_id);
                active.approval_url = Set(approval_url);
                active.capture_id = Set(None);
                active.updated_at = Set(now);
                Ok(active.update(conn).await?)
            }
            None => payment_transaction::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                method: Set(method),
                status: Set(TransactionStatus::Pending),
                amount: Set(amount),
                currency: Set(order.currency.clone()),
                external_id: Set(external_id),
                approval_url: Set(approval_url),
                capture_id: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(|e| {
                ServiceError::from_db_conflict(
                    e,
                    format!("Order {} already has a payment in progress", order.id),
                )
            }),
        }
    }

    /// Marks a PENDING transaction COMPLETED.
    ///
    /// The status filter makes a writer working from a stale read lose: a
    /// row completed meanwhile yields `PaymentAlreadyCompleted`, one canceled
    /// meanwhile yields `Conflict`.
    pub async fn mark_completed<C: ConnectionTrait>(
        conn: &C,
        transaction: &payment_transaction::Model,
        capture_id: Option<String>,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let result = payment_transaction::Entity::update_many()
            .set(payment_transaction::ActiveModel {
                status: Set(TransactionStatus::Completed),
                capture_id: Set(capture_id.or_else(|| transaction.capture_id.clone())),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(payment_transaction::Column::Id.eq(transaction.id))
            .filter(payment_transaction::Column::Status.eq(TransactionStatus::Pending))
            .exec(conn)
            .await?;
        if result.rows_affected != 1 {
            let current = Self::reload(conn, transaction.id).await?;
            if current.is_completed() {
                return Err(ServiceError::PaymentAlreadyCompleted(transaction.order_id));
            }
            return Err(ServiceError::Conflict(format!(
                "Payment for order {} is {:?} and can no longer be completed",
                transaction.order_id, current.status
            )));
        }
        Self::reload(conn, transaction.id).await
    }

    /// Cancels a non-completed transaction, keeping the row.
    pub async fn cancel<C: ConnectionTrait>(
        conn: &C,
        transaction: &payment_transaction::Model,
    ) -> Result<payment_transaction::Model, ServiceError> {
        if transaction.is_completed() {
            return Err(ServiceError::PaymentAlreadyCompleted(transaction.order_id));
        }
        if transaction.status == TransactionStatus::Canceled {
            return Ok(transaction.clone());
        }
        let mut active: payment_transaction::ActiveModel = transaction.clone().into();
        active.status = Set(TransactionStatus::Canceled);
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }

    async fn reload<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<payment_transaction::Model, ServiceError> {
        payment_transaction::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment transaction {} not found", id)))
    }

    pub async fn publish(&self, event: Event) {
        self.event_sender.send_or_log(event).await;
    }

    /// Announces a settled order to downstream listeners. Called after commit.
    pub async fn publish_completed(&self, order: &order::Model) {
        let customer_email = match self.users.get_user(order.user_id).await {
            Ok(user) => Some(user.email),
            Err(e) => {
                warn!(order_id = %order.id, "Could not resolve customer email: {}", e);
                None
            }
        };
        self.publish(Event::OrderCompleted(OrderCompletedEvent {
            order_id: order.id,
            order_total: order.order_total.unwrap_or_default(),
            customer_email,
        }))
        .await;
        info!(order_id = %order.id, "Published order completion");
    }
}

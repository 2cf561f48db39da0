use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{order, payment_transaction, OrderStatus, PaymentMethod, TransactionStatus},
    errors::ServiceError,
    events::Event,
    services::orders::transition_status,
};

use super::ledger::{OpenAttempt, PaymentLedger};
use super::registry::OfflinePaymentStrategy;

/// Cash on delivery: the order is confirmed at once and the payment is
/// completed when the courier collects.
pub struct CashOnDeliveryStrategy {
    ledger: Arc<PaymentLedger>,
}

impl CashOnDeliveryStrategy {
    pub fn new(ledger: Arc<PaymentLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl OfflinePaymentStrategy for CashOnDeliveryStrategy {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::CashOnDelivery
    }

    #[instrument(skip(self))]
    async fn create_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let OpenAttempt {
            txn,
            order,
            transaction,
        } = self.ledger.begin_attempt(user_id, order_id).await?;

        PaymentLedger::open_pending(&txn, &order, transaction, self.method(), None).await?;
        let order = transition_status(&txn, &order, OrderStatus::Confirmed).await?;
        txn.commit().await?;

        self.ledger
            .publish(Event::PaymentCreated {
                order_id,
                method: self.method(),
            })
            .await;

        info!("Confirmed order {} for {}", order_id, self.method());
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn complete_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let OpenAttempt {
            txn,
            order,
            transaction,
        } = self.ledger.open(user_id, order_id).await?;

        let transaction = transaction.ok_or_else(|| {
            ServiceError::NotFound(format!("No payment transaction for order {}", order_id))
        })?;
        if transaction.is_completed() {
            return Err(ServiceError::PaymentAlreadyCompleted(order_id));
        }
        if transaction.method != self.method() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is being paid with {}, not {}",
                order_id,
                transaction.method,
                self.method()
            )));
        }
        if transaction.status == TransactionStatus::Canceled {
            return Err(ServiceError::InvalidOperation(format!(
                "Payment for order {} was canceled",
                order_id
            )));
        }

        let completed = PaymentLedger::mark_completed(&txn, &transaction, None).await?;
        txn.commit().await?;

        self.ledger.publish_completed(&order).await;

        info!("Completed {} payment for order {}", self.method(), order_id);
        Ok(completed)
    }
}

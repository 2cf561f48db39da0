use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{order, payment_transaction, OrderStatus, PaymentMethod, TransactionStatus},
    errors::ServiceError,
    events::Event,
    services::orders::{load_owned_order, transition_status},
};

use super::ledger::{OpenAttempt, PaymentLedger};
use super::offline::CashOnDeliveryStrategy;
use super::online::PayPalStrategy;
use super::processor::PaymentProcessor;
use super::registry::{
    CaptureResult, OnlinePaymentCreated, PaymentMode, PaymentStrategyRegistry,
};

/// Outcome of a create step, by payment mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaymentCreation {
    Online(OnlinePaymentCreated),
    Offline(order::Model),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub currency: String,
    pub external_id: Option<String>,
    pub capture_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment_transaction::Model> for TransactionSummary {
    fn from(tx: payment_transaction::Model) -> Self {
        Self {
            id: tx.id,
            method: tx.method,
            status: tx.status,
            amount: tx.amount,
            currency: tx.currency,
            external_id: tx.external_id,
            capture_id: tx.capture_id,
            updated_at: tx.updated_at,
        }
    }
}

/// Payment state of an order. `transaction` is absent until a payment is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusView {
    pub order_id: Uuid,
    pub order_status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionSummary>,
}

/// Entry point for every payment step.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    registry: Arc<PaymentStrategyRegistry>,
    ledger: Arc<PaymentLedger>,
}

impl PaymentOrchestrator {
    pub fn new(registry: Arc<PaymentStrategyRegistry>, ledger: Arc<PaymentLedger>) -> Self {
        Self { registry, ledger }
    }

    /// Registers PayPal and cash on delivery over `processor`.
    pub fn with_default_strategies(
        ledger: Arc<PaymentLedger>,
        processor: Arc<dyn PaymentProcessor>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let registry = PaymentStrategyRegistry::new(vec![
            PaymentMode::Online(Arc::new(PayPalStrategy::new(
                ledger.clone(),
                processor,
                config,
            ))),
            PaymentMode::Offline(Arc::new(CashOnDeliveryStrategy::new(ledger.clone()))),
        ])?;
        Ok(Self::new(Arc::new(registry), ledger))
    }

    pub fn registry(&self) -> &PaymentStrategyRegistry {
        &self.registry
    }

    #[instrument(skip(self))]
    pub async fn create_payment(
        &self,
        method: PaymentMethod,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentCreation, ServiceError> {
        match self.registry.resolve(method)? {
            PaymentMode::Online(strategy) => strategy
                .create_payment(user_id, order_id)
                .await
                .map(PaymentCreation::Online),
            PaymentMode::Offline(strategy) => strategy
                .create_payment(user_id, order_id)
                .await
                .map(PaymentCreation::Offline),
        }
    }

    #[instrument(skip(self))]
    pub async fn capture(
        &self,
        method: PaymentMethod,
        user_id: Uuid,
        order_id: Uuid,
        external_id: &str,
    ) -> Result<CaptureResult, ServiceError> {
        self.registry
            .resolve_online(method)?
            .capture_payment(user_id, order_id, external_id)
            .await
    }

    #[instrument(skip(self))]
    pub async fn complete_offline(
        &self,
        method: PaymentMethod,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<payment_transaction::Model, ServiceError> {
        self.registry
            .resolve_offline(method)?
            .complete_payment(user_id, order_id)
            .await
    }

    /// Records a failed payment attempt.
    ///
    /// Any open transaction is canceled (kept, not deleted) and the order
    /// moves to PAYMENT_FAILED, whether or not a transaction existed.
    /// Repeating the call is harmless.
    #[instrument(skip(self))]
    pub async fn handle_failure(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentStatusView, ServiceError> {
        let OpenAttempt {
            txn,
            order,
            transaction,
        } = self.ledger.open(user_id, order_id).await?;

        let transaction = match transaction {
            Some(tx) => Some(PaymentLedger::cancel(&txn, &tx).await?),
            None => None,
        };
        let order = transition_status(&txn, &order, OrderStatus::PaymentFailed).await?;
        txn.commit().await?;

        self.ledger.publish(Event::PaymentFailed(order_id)).await;

        info!("Recorded payment failure for order {}", order_id);
        Ok(PaymentStatusView {
            order_id,
            order_status: order.status,
            transaction: transaction.map(TransactionSummary::from),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_status(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<PaymentStatusView, ServiceError> {
        let order = load_owned_order(self.ledger.db(), user_id, order_id).await?;
        let transaction = PaymentLedger::find_transaction(self.ledger.db(), order_id).await?;
        Ok(PaymentStatusView {
            order_id,
            order_status: order.status,
            transaction: transaction.map(TransactionSummary::from),
        })
    }
}

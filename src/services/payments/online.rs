use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{order, payment_transaction, OrderStatus, PaymentMethod, TransactionStatus},
    errors::ServiceError,
    events::Event,
    services::orders::transition_status,
};

use super::ledger::{OpenAttempt, PaymentLedger, PaymentSnapshot};
use super::processor::{PaymentProcessor, RemoteOrder, RemoteOrderRequest};
use super::registry::{CaptureResult, OnlinePaymentCreated, OnlinePaymentStrategy};

/// PayPal checkout: create a remote order, then capture once the payer approves.
pub struct PayPalStrategy {
    ledger: Arc<PaymentLedger>,
    processor: Arc<dyn PaymentProcessor>,
    return_url: String,
    cancel_url: String,
}

impl PayPalStrategy {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        processor: Arc<dyn PaymentProcessor>,
        config: &AppConfig,
    ) -> Self {
        Self {
            ledger,
            processor,
            return_url: config.payment_return_url.clone(),
            cancel_url: config.payment_cancel_url.clone(),
        }
    }
}

#[async_trait]
impl OnlinePaymentStrategy for PayPalStrategy {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::PayPal
    }

    /// Opens the remote order and records it as a PENDING transaction.
    /// The order moves to PENDING_PAYMENT.
    ///
    /// The processor is called with no database transaction open; the
    /// recording step re-reads the order and loses with `Conflict` if another
    /// writer got there first.
    #[instrument(skip(self))]
    async fn create_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OnlinePaymentCreated, ServiceError> {
        let PaymentSnapshot { order, transaction } =
            self.ledger.snapshot(user_id, order_id).await?;
        self.ledger.validate(&order, transaction.as_ref())?;

        let amount = order
            .order_total
            .ok_or(ServiceError::InvalidOrderTotal(order.id))?;
        let remote = self
            .processor
            .create_remote_order(&RemoteOrderRequest {
                reference: order.id,
                amount,
                currency: order.currency.clone(),
                return_url: self.return_url.clone(),
                cancel_url: self.cancel_url.clone(),
            })
            .await?;

        let recorded = match self.record_remote_order(&order, &remote).await {
            Ok(recorded) => recorded,
            Err(e) => {
                warn!(
                    order_id = %order_id,
                    external_id = %remote.external_id,
                    "Remote order created but not recorded: {}",
                    e
                );
                return Err(e);
            }
        };

        self.ledger
            .publish(Event::PaymentCreated {
                order_id,
                method: self.method(),
            })
            .await;

        info!(
            "Opened {} payment {} for order {}",
            self.method(),
            remote.external_id,
            order_id
        );
        Ok(OnlinePaymentCreated {
            order_id,
            external_id: remote.external_id,
            approval_url: remote.approval_url,
            status: recorded.status,
            amount: recorded.amount,
            currency: recorded.currency,
        })
    }

    /// Captures an approved payment. `external_id` must match the recorded
    /// reference; nothing changes unless the processor reports completion.
    #[instrument(skip(self))]
    async fn capture_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        external_id: &str,
    ) -> Result<CaptureResult, ServiceError> {
        let PaymentSnapshot { order, transaction } =
            self.ledger.snapshot(user_id, order_id).await?;
        let transaction = self.capturable(order_id, transaction, external_id)?;

        let capture = self.processor.capture_remote_order(external_id).await?;
        if !capture.is_completed() {
            return Err(ServiceError::ExternalCaptureIncomplete(format!(
                "processor reported {} for {}",
                capture.status, external_id
            )));
        }

        let OpenAttempt { txn, order, .. } = match self.ledger.reopen(&order).await {
            Ok(attempt) => attempt,
            Err(e) => {
                error!(
                    order_id = %order_id,
                    capture_id = ?capture.capture_id,
                    "Remote capture succeeded but the order changed: {}",
                    e
                );
                return Err(e);
            }
        };
        let completed =
            PaymentLedger::mark_completed(&txn, &transaction, capture.capture_id.clone()).await?;
        let order = transition_status(&txn, &order, OrderStatus::Confirmed).await?;
        txn.commit().await?;

        self.ledger.publish(Event::PaymentCaptured(order_id)).await;
        self.ledger.publish_completed(&order).await;

        info!("Captured payment for order {}", order_id);
        Ok(CaptureResult {
            order_id,
            capture_id: completed.capture_id,
            status: completed.status,
            amount: completed.amount,
        })
    }
}

impl PayPalStrategy {
    async fn record_remote_order(
        &self,
        seen: &order::Model,
        remote: &RemoteOrder,
    ) -> Result<payment_transaction::Model, ServiceError> {
        let OpenAttempt {
            txn,
            order,
            transaction,
        } = self.ledger.reopen(seen).await?;
        self.ledger.validate(&order, transaction.as_ref())?;

        let recorded =
            PaymentLedger::open_pending(&txn, &order, transaction, self.method(), Some(remote))
                .await?;
        transition_status(&txn, &order, OrderStatus::PendingPayment).await?;
        txn.commit().await?;
        Ok(recorded)
    }

    /// Checks a pending transaction can be captured with `external_id`.
    fn capturable(
        &self,
        order_id: Uuid,
        transaction: Option<payment_transaction::Model>,
        external_id: &str,
    ) -> Result<payment_transaction::Model, ServiceError> {
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
        if transaction.external_id.as_deref() != Some(external_id) {
            warn!(order_id = %order_id, "Capture requested with mismatched external reference");
            return Err(ServiceError::ExternalPaymentMismatch {
                order_id,
                supplied: external_id.to_string(),
            });
        }
        if transaction.status == TransactionStatus::Canceled {
            return Err(ServiceError::InvalidOperation(format!(
                "Payment for order {} was canceled",
                order_id
            )));
        }
        Ok(transaction)
    }
}

//! Ordered guards evaluated before a payment attempt is opened.

use rust_decimal::Decimal;

use crate::entities::{order, payment_transaction, OrderStatus};
use crate::errors::ServiceError;

/// State a guard inspects, read inside the paying transaction.
#[derive(Debug, Clone, Copy)]
pub struct PaymentAttempt<'a> {
    pub order: &'a order::Model,
    pub transaction: Option<&'a payment_transaction::Model>,
}

pub type Guard = fn(&PaymentAttempt<'_>) -> Result<(), ServiceError>;

/// Guards run in insertion order; the first failure is returned and later
/// guards are not evaluated.
#[derive(Clone)]
pub struct PaymentValidationChain {
    guards: Vec<(&'static str, Guard)>,
}

impl PaymentValidationChain {
    pub fn empty() -> Self {
        Self { guards: Vec::new() }
    }

    /// Already-completed, total, then status.
    pub fn standard() -> Self {
        Self::empty()
            .with_guard("already_completed", already_completed_guard)
            .with_guard("order_total", order_total_guard)
            .with_guard("order_status", order_status_guard)
    }

    pub fn with_guard(mut self, name: &'static str, guard: Guard) -> Self {
        self.guards.push((name, guard));
        self
    }

    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|(name, _)| *name).collect()
    }

    pub fn validate(&self, attempt: &PaymentAttempt<'_>) -> Result<(), ServiceError> {
        for (name, guard) in &self.guards {
            guard(attempt).map_err(|e| {
                tracing::info!(order_id = %attempt.order.id, guard = name, "Payment guard rejected order");
                e
            })?;
        }
        Ok(())
    }
}

impl Default for PaymentValidationChain {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn already_completed_guard(attempt: &PaymentAttempt<'_>) -> Result<(), ServiceError> {
    match attempt.transaction {
        Some(tx) if tx.is_completed() => Err(ServiceError::PaymentAlreadyCompleted(attempt.order.id)),
        _ => Ok(()),
    }
}

pub fn order_total_guard(attempt: &PaymentAttempt<'_>) -> Result<(), ServiceError> {
    match attempt.order.order_total {
        Some(total) if total > Decimal::ZERO => Ok(()),
        _ => Err(ServiceError::InvalidOrderTotal(attempt.order.id)),
    }
}

pub fn order_status_guard(attempt: &PaymentAttempt<'_>) -> Result<(), ServiceError> {
    match attempt.order.status {
        OrderStatus::Pending | OrderStatus::PaymentFailed => Ok(()),
        other => Err(ServiceError::InvalidOrderStatus {
            order_id: attempt.order.id,
            status: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PaymentMethod, TransactionStatus};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(status: OrderStatus, total: Option<Decimal>) -> order::Model {
        let now = Utc::now();
        order::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status,
            order_total: total,
            currency: "USD".into(),
            shipping_recipient: None,
            shipping_line1: None,
            shipping_line2: None,
            shipping_city: None,
            shipping_region: None,
            shipping_postal_code: None,
            shipping_country: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn transaction(order: &order::Model, status: TransactionStatus) -> payment_transaction::Model {
        let now = Utc::now();
        payment_transaction::Model {
            id: Uuid::new_v4(),
            order_id: order.id,
            method: PaymentMethod::CashOnDelivery,
            status,
            amount: order.order_total.unwrap_or_default(),
            currency: "USD".into(),
            external_id: None,
            approval_url: None,
            capture_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn pending_order_with_total_passes() {
        let o = order(OrderStatus::Pending, Some(dec!(50.00)));
        let attempt = PaymentAttempt {
            order: &o,
            transaction: None,
        };
        assert!(PaymentValidationChain::standard().validate(&attempt).is_ok());
    }

    #[test]
    fn failed_order_may_be_retried() {
        let o = order(OrderStatus::PaymentFailed, Some(dec!(50.00)));
        let tx = transaction(&o, TransactionStatus::Canceled);
        let attempt = PaymentAttempt {
            order: &o,
            transaction: Some(&tx),
        };
        assert!(PaymentValidationChain::standard().validate(&attempt).is_ok());
    }

    #[test]
    fn completed_transaction_is_reported_first() {
        let o = order(OrderStatus::Confirmed, None);
        let tx = transaction(&o, TransactionStatus::Completed);
        let attempt = PaymentAttempt {
            order: &o,
            transaction: Some(&tx),
        };
        assert_matches!(
            PaymentValidationChain::standard().validate(&attempt),
            Err(ServiceError::PaymentAlreadyCompleted(id)) if id == o.id
        );
    }

    #[test]
    fn total_guard_short_circuits_status_guard() {
        let o = order(OrderStatus::PendingPayment, Some(Decimal::ZERO));
        let attempt = PaymentAttempt {
            order: &o,
            transaction: None,
        };
        assert_matches!(
            PaymentValidationChain::standard().validate(&attempt),
            Err(ServiceError::InvalidOrderTotal(_))
        );
    }

    #[test]
    fn missing_total_is_invalid() {
        let o = order(OrderStatus::Pending, None);
        assert_matches!(
            order_total_guard(&PaymentAttempt {
                order: &o,
                transaction: None
            }),
            Err(ServiceError::InvalidOrderTotal(_))
        );
    }

    #[test]
    fn confirmed_order_fails_status_guard() {
        let o = order(OrderStatus::Confirmed, Some(dec!(10.00)));
        let attempt = PaymentAttempt {
            order: &o,
            transaction: None,
        };
        assert_matches!(
            PaymentValidationChain::standard().validate(&attempt),
            Err(ServiceError::InvalidOrderStatus { status, .. }) if status == "CONFIRMED"
        );
    }

    #[test]
    fn appended_guard_runs_after_standard_ones() {
        fn reject_everything(attempt: &PaymentAttempt<'_>) -> Result<(), ServiceError> {
            Err(ServiceError::InvalidOperation(format!("blocked {}", attempt.order.id)))
        }
        let chain = PaymentValidationChain::standard().with_guard("blocklist", reject_everything);
        assert_eq!(
            chain.guard_names(),
            vec!["already_completed", "order_total", "order_status", "blocklist"]
        );

        let o = order(OrderStatus::Pending, Some(dec!(1.00)));
        assert_matches!(
            chain.validate(&PaymentAttempt {
                order: &o,
                transaction: None
            }),
            Err(ServiceError::InvalidOperation(_))
        );

        let bad_total = order(OrderStatus::Pending, None);
        assert_matches!(
            chain.validate(&PaymentAttempt {
                order: &bad_total,
                transaction: None
            }),
            Err(ServiceError::InvalidOrderTotal(_))
        );
    }
}

//! Legal order status transitions.

use crate::entities::{order, OrderStatus};
use crate::errors::ServiceError;

/// Whether `from -> to` is a legal status change.
///
/// `PaymentFailed -> PaymentFailed` is accepted so repeated failure
/// reports are harmless. `Confirmed` is terminal for payment purposes.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, PendingPayment)
            | (Pending, PaymentFailed)
            | (Pending, Confirmed)
            | (PendingPayment, Confirmed)
            | (PendingPayment, PaymentFailed)
            | (PaymentFailed, PendingPayment)
            | (PaymentFailed, Confirmed)
            | (PaymentFailed, PaymentFailed)
    )
}

pub fn ensure_transition(order: &order::Model, to: OrderStatus) -> Result<(), ServiceError> {
    if is_valid_transition(order.status, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "Order {} cannot move from {} to {}",
            order.id, order.status, to
        )))
    }
}

/// A shipping address may be attached once, while the order is still PENDING.
pub fn ensure_shipping_address_assignable(order: &order::Model) -> Result<(), ServiceError> {
    if order.status != OrderStatus::Pending {
        return Err(ServiceError::InvalidOperation(format!(
            "Shipping address can only be set while order {} is PENDING (currently {})",
            order.id, order.status
        )));
    }
    if order.has_shipping_address() {
        return Err(ServiceError::InvalidOperation(format!(
            "Order {} already has a shipping address",
            order.id
        )));
    }
    Ok(())
}

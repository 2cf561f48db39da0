use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{order, payment_transaction, PaymentMethod, TransactionStatus};
use crate::errors::ServiceError;

/// Response of an online create: where to send the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlinePaymentCreated {
    pub order_id: Uuid,
    pub external_id: String,
    pub approval_url: Option<String>,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub order_id: Uuid,
    pub capture_id: Option<String>,
    pub status: TransactionStatus,
    pub amount: Decimal,
}

/// Redirect-based method settled by a later capture.
#[async_trait]
pub trait OnlinePaymentStrategy: Send + Sync {
    fn method(&self) -> PaymentMethod;

    async fn create_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OnlinePaymentCreated, ServiceError>;

    async fn capture_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        external_id: &str,
    ) -> Result<CaptureResult, ServiceError>;
}

/// Method confirmed without an external round-trip and completed later.
#[async_trait]
pub trait OfflinePaymentStrategy: Send + Sync {
    fn method(&self) -> PaymentMethod;

    async fn create_payment(&self, user_id: Uuid, order_id: Uuid)
        -> Result<order::Model, ServiceError>;

    async fn complete_payment(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<payment_transaction::Model, ServiceError>;
}

impl std::fmt::Debug for dyn OnlinePaymentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlinePaymentStrategy")
            .field("method", &self.method())
            .finish()
    }
}

impl std::fmt::Debug for dyn OfflinePaymentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflinePaymentStrategy")
            .field("method", &self.method())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum PaymentMode {
    Online(Arc<dyn OnlinePaymentStrategy>),
    Offline(Arc<dyn OfflinePaymentStrategy>),
}

impl PaymentMode {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentMode::Online(s) => s.method(),
            PaymentMode::Offline(s) => s.method(),
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, PaymentMode::Online(_))
    }
}

/// Method-to-strategy map, fixed at construction.
pub struct PaymentStrategyRegistry {
    strategies: HashMap<PaymentMethod, PaymentMode>,
}

impl PaymentStrategyRegistry {
    pub fn new(modes: Vec<PaymentMode>) -> Result<Self, ServiceError> {
        let mut strategies = HashMap::with_capacity(modes.len());
        for mode in modes {
            let method = mode.method();
            if strategies.insert(method, mode).is_some() {
                return Err(ServiceError::InternalError(format!(
                    "payment method {} registered twice",
                    method
                )));
            }
        }
        Ok(Self { strategies })
    }

    /// Parses a method identifier such as `paypal` or `cash_on_delivery`.
    pub fn parse_method(raw: &str) -> Result<PaymentMethod, ServiceError> {
        PaymentMethod::from_str(raw.trim())
            .map_err(|_| ServiceError::UnsupportedPaymentMethod(raw.to_string()))
    }

    pub fn resolve(&self, method: PaymentMethod) -> Result<&PaymentMode, ServiceError> {
        self.strategies
            .get(&method)
            .ok_or_else(|| ServiceError::UnsupportedPaymentMethod(method.to_string()))
    }

    pub fn resolve_online(
        &self,
        method: PaymentMethod,
    ) -> Result<Arc<dyn OnlinePaymentStrategy>, ServiceError> {
        match self.resolve(method)? {
            PaymentMode::Online(s) => Ok(s.clone()),
            PaymentMode::Offline(_) => Err(ServiceError::UnsupportedPaymentMethod(format!(
                "{} is not an online method",
                method
            ))),
        }
    }

    pub fn resolve_offline(
        &self,
        method: PaymentMethod,
    ) -> Result<Arc<dyn OfflinePaymentStrategy>, ServiceError> {
        match self.resolve(method)? {
            PaymentMode::Offline(s) => Ok(s.clone()),
            PaymentMode::Online(_) => Err(ServiceError::UnsupportedPaymentMethod(format!(
                "{} is not an offline method",
                method
            ))),
        }
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<_> = self.strategies.keys().copied().collect();
        methods.sort_by_key(|m| m.to_string());
        methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct StubOffline;

    #[async_trait]
    impl OfflinePaymentStrategy for StubOffline {
        fn method(&self) -> PaymentMethod {
            PaymentMethod::CashOnDelivery
        }

        async fn create_payment(
            &self,
            _user_id: Uuid,
            order_id: Uuid,
        ) -> Result<order::Model, ServiceError> {
            Err(ServiceError::NotFound(order_id.to_string()))
        }

        async fn complete_payment(
            &self,
            _user_id: Uuid,
            order_id: Uuid,
        ) -> Result<payment_transaction::Model, ServiceError> {
            Err(ServiceError::NotFound(order_id.to_string()))
        }
    }

    fn registry() -> PaymentStrategyRegistry {
        PaymentStrategyRegistry::new(vec![PaymentMode::Offline(Arc::new(StubOffline))]).unwrap()
    }

    #[test]
    fn resolves_registered_offline_method() {
        let registry = registry();
        assert!(registry.resolve_offline(PaymentMethod::CashOnDelivery).is_ok());
        assert_eq!(registry.methods(), vec![PaymentMethod::CashOnDelivery]);
    }

    #[test]
    fn wrong_mode_is_unsupported() {
        assert_matches!(
            registry().resolve_online(PaymentMethod::CashOnDelivery),
            Err(ServiceError::UnsupportedPaymentMethod(_))
        );
    }

    #[test]
    fn unregistered_method_is_unsupported() {
        assert_matches!(
            registry().resolve(PaymentMethod::PayPal),
            Err(ServiceError::UnsupportedPaymentMethod(m)) if m == "paypal"
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = PaymentStrategyRegistry::new(vec![
            PaymentMode::Offline(Arc::new(StubOffline)),
            PaymentMode::Offline(Arc::new(StubOffline)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_method_identifiers() {
        assert_eq!(
            PaymentStrategyRegistry::parse_method("paypal").unwrap(),
            PaymentMethod::PayPal
        );
        assert_eq!(
            PaymentStrategyRegistry::parse_method("cod").unwrap(),
            PaymentMethod::CashOnDelivery
        );
        assert_matches!(
            PaymentStrategyRegistry::parse_method("bitcoin"),
            Err(ServiceError::UnsupportedPaymentMethod(m)) if m == "bitcoin"
        );
    }
}

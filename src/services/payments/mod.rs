//! Payment validation, strategies and orchestration.

pub mod ledger;
pub mod offline;
pub mod online;
pub mod orchestrator;
pub mod processor;
pub mod registry;
pub mod validation;

pub use ledger::{PaymentLedger, PaymentSnapshot};
pub use offline::CashOnDeliveryStrategy;
pub use online::PayPalStrategy;
pub use orchestrator::{PaymentCreation, PaymentOrchestrator, PaymentStatusView, TransactionSummary};
pub use processor::{
    HttpPaymentProcessor, PaymentProcessor, RemoteCapture, RemoteOrder, RemoteOrderRequest,
};
pub use registry::{
    CaptureResult, OfflinePaymentStrategy, OnlinePaymentCreated, OnlinePaymentStrategy,
    PaymentMode, PaymentStrategyRegistry,
};
pub use validation::{PaymentAttempt, PaymentValidationChain};

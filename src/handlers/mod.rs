pub mod commerce;
pub mod common;
pub mod health;
pub mod orders;
pub mod payments;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    services::{
        commerce::{CartService, CheckoutAssembler, WishlistService},
        orders::OrderService,
        payments::{PaymentLedger, PaymentOrchestrator, PaymentProcessor, PaymentValidationChain},
        users::UserDirectory,
    },
    AppState,
};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Services shared by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub wishlist: Arc<WishlistService>,
    pub checkout: Arc<CheckoutAssembler>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentOrchestrator>,
}

impl AppServices {
    /// Wires every service over one pool and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Result<Self, ServiceError> {
        let users = Arc::new(UserDirectory::new(db.clone()));
        let ledger = Arc::new(PaymentLedger::new(
            db.clone(),
            PaymentValidationChain::standard(),
            event_sender.clone(),
            users,
        ));
        let payments = PaymentOrchestrator::with_default_strategies(ledger, processor, &config)?;

        Ok(Self {
            cart: Arc::new(CartService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            wishlist: Arc::new(WishlistService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            checkout: Arc::new(CheckoutAssembler::new(
                db.clone(),
                event_sender.clone(),
                config,
            )),
            orders: Arc::new(OrderService::new(db, event_sender)),
            payments: Arc::new(payments),
        })
    }
}

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/cart", commerce::carts_routes())
        .nest("/wishlist", commerce::wishlists_routes())
        .nest("/orders", orders::orders_routes())
        .nest("/payments", payments::payments_routes())
}

//! StateSet Checkout
//!
//! Cart and wishlist snapshots, cart-to-order assembly, the order status
//! state machine and pluggable payment strategies, served over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::events::{
    listeners::{InventoryDecrementListener, Mailer, OrderConfirmationListener},
    EventHandler, EventSender,
};
use crate::services::payments::PaymentProcessor;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn build(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        processor: Arc<dyn PaymentProcessor>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self, errors::ServiceError> {
        let services =
            handlers::AppServices::new(db.clone(), event_sender.clone(), config.clone(), processor)?;
        Ok(Self {
            db,
            config,
            event_sender,
            services,
        })
    }
}

/// Listeners run for every published event.
pub fn default_event_handlers(
    db: Arc<DatabaseConnection>,
    mailer: Arc<dyn Mailer>,
) -> Vec<Arc<dyn EventHandler>> {
    vec![
        Arc::new(InventoryDecrementListener::new(db)),
        Arc::new(OrderConfirmationListener::new(mailer)),
    ]
}

/// Full application router: health probes plus the v1 API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(|| async { "stateset-checkout up" }))
        .nest("/health", handlers::health::health_routes())
        .nest("/api/v1", handlers::api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::Value;
use stateset_checkout::{
    auth,
    config::AppConfig,
    db,
    entities::{order, product, user, ProductStatus},
    errors::ServiceError,
    events::{self, Event},
    services::{
        commerce::RequestedLine,
        orders::OrderDetail,
        payments::{PaymentProcessor, RemoteCapture, RemoteOrder, RemoteOrderRequest},
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Processor double: succeeds by default, with per-call overrides.
#[derive(Default)]
pub struct FakeProcessor {
    pub create_calls: AtomicUsize,
    pub capture_calls: AtomicUsize,
    next_create_error: Mutex<Option<ServiceError>>,
    next_capture_error: Mutex<Option<ServiceError>>,
    capture_status: Mutex<Option<String>>,
    pub last_request: Mutex<Option<RemoteOrderRequest>>,
    db_during_calls: Mutex<Option<Arc<DatabaseConnection>>>,
    db_reads: AtomicUsize,
}

impl FakeProcessor {
    pub fn fail_next_create(&self, err: ServiceError) {
        *self.next_create_error.lock().unwrap() = Some(err);
    }

    pub fn fail_next_capture(&self, err: ServiceError) {
        *self.next_capture_error.lock().unwrap() = Some(err);
    }

    /// Status reported by subsequent captures; `COMPLETED` when unset.
    pub fn set_capture_status(&self, status: &str) {
        *self.capture_status.lock().unwrap() = Some(status.to_string());
    }

    /// Makes every processor call read from `db` first; see [`Self::db_reads`].
    pub fn read_db_during_calls(&self, db: Arc<DatabaseConnection>) {
        *self.db_during_calls.lock().unwrap() = Some(db);
    }

    /// Reads that completed while a processor call was in flight.
    pub fn db_reads(&self) -> usize {
        self.db_reads.load(Ordering::SeqCst)
    }

    async fn touch_db(&self) {
        let db = self.db_during_calls.lock().unwrap().clone();
        if let Some(db) = db {
            if order::Entity::find().count(db.as_ref()).await.is_ok() {
                self.db_reads.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn external_id_for(order_id: Uuid) -> String {
        format!("EXT-{}", order_id.simple())
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_remote_order(
        &self,
        request: &RemoteOrderRequest,
    ) -> Result<RemoteOrder, ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.touch_db().await;
        if let Some(err) = self.next_create_error.lock().unwrap().take() {
            return Err(err);
        }
        let external_id = Self::external_id_for(request.reference);
        Ok(RemoteOrder {
            approval_url: Some(format!("https://processor.test/approve/{}", external_id)),
            external_id,
            status: "CREATED".to_string(),
        })
    }

    async fn capture_remote_order(&self, external_id: &str) -> Result<RemoteCapture, ServiceError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        self.touch_db().await;
        if let Some(err) = self.next_capture_error.lock().unwrap().take() {
            return Err(err);
        }
        let status = self
            .capture_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "COMPLETED".to_string());
        Ok(RemoteCapture {
            capture_id: Some(format!("CAP-{}", external_id)),
            status,
        })
    }
}

/// Application state over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    pub processor: Arc<FakeProcessor>,
    events: tokio::sync::Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let processor = Arc::new(FakeProcessor::default());
        let state = Arc::new(
            AppState::build(
                Arc::new(pool),
                Arc::new(cfg),
                processor.clone(),
                Arc::new(event_sender),
            )
            .expect("wire services"),
        );
        let router = stateset_checkout::build_router(state.clone());

        Self {
            router,
            state,
            processor,
            events: tokio::sync::Mutex::new(event_rx),
        }
    }

    pub fn db(&self) -> Arc<DatabaseConnection> {
        self.state.db.clone()
    }

    /// Every event published since the last call.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = rx.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub async fn seed_user(&self, email: &str) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Test User".to_string()),
            shipping_recipient: Set(None),
            shipping_line1: Set(None),
            shipping_line2: Set(None),
            shipping_city: Set(None),
            shipping_region: Set(None),
            shipping_postal_code: Set(None),
            shipping_country: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed user")
    }

    pub async fn seed_user_with_address(&self, email: &str) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Avery Quinn".to_string()),
            shipping_recipient: Set(None),
            shipping_line1: Set(Some("12 Harbor Road".to_string())),
            shipping_line2: Set(None),
            shipping_city: Set(Some("Portland".to_string())),
            shipping_region: Set(Some("OR".to_string())),
            shipping_postal_code: Set(Some("97201".to_string())),
            shipping_country: Set(Some("US".to_string())),
            created_at: Set(Utc::now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed user with address")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, quantity: i32) -> product::Model {
        self.seed_product_with_status(name, price, quantity, ProductStatus::Active)
            .await
    }

    pub async fn seed_product_with_status(
        &self,
        name: &str,
        price: Decimal,
        quantity: i32,
        status: ProductStatus,
    ) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            quantity: Set(quantity),
            status: Set(status),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product")
    }

    pub async fn set_product_price(&self, product: &product::Model, price: Decimal) {
        let mut active: product::ActiveModel = product.clone().into();
        active.price = Set(price);
        active.update(self.state.db.as_ref()).await.expect("update price");
    }

    pub async fn set_product_quantity(&self, product: &product::Model, quantity: i32) {
        let mut active: product::ActiveModel = product.clone().into();
        active.quantity = Set(quantity);
        active
            .update(self.state.db.as_ref())
            .await
            .expect("update quantity");
    }

    /// Puts one product in the user's cart and checks out.
    pub async fn place_order(
        &self,
        user_id: Uuid,
        price: Decimal,
        quantity: i32,
    ) -> OrderDetail {
        let product = self.seed_product("Order Item", price, quantity + 10).await;
        self.state
            .services
            .cart
            .sync_snapshot(
                user_id,
                vec![RequestedLine {
                    product_id: product.id,
                    quantity,
                }],
            )
            .await
            .expect("fill cart");
        self.state
            .services
            .checkout
            .create_order_from_cart(user_id)
            .await
            .expect("checkout")
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        auth::issue_token(TEST_SECRET, user_id, 3600).expect("issue token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_as(
        &self,
        user_id: Uuid,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.token_for(user_id);
        self.request(method, uri, body, Some(&token)).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser, errors::ServiceError, services::payments::PaymentStrategyRegistry,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for payment endpoints.
///
/// The `:method` segment is a payment method name such as `paypal` or
/// `cash_on_delivery`.
pub fn payments_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/methods", get(list_methods))
        .route("/orders/:id/status", get(get_status))
        .route("/orders/:id/failure", post(record_failure))
        .route("/:method/orders/:id", post(create_payment))
        .route("/:method/orders/:id/capture", post(capture_payment))
        .route("/:method/orders/:id/complete", post(complete_payment))
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CaptureRequest {
    #[validate(length(min = 1, max = 128))]
    pub external_id: String,
}

async fn list_methods(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let methods: Vec<_> = state
        .services
        .payments
        .registry()
        .methods()
        .into_iter()
        .map(|m| m.to_string())
        .collect();
    success_response(methods)
}

/// Start a payment for an order with the given method
async fn create_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path((method, order_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let method = PaymentStrategyRegistry::parse_method(&method)?;
    let created = state
        .services
        .payments
        .create_payment(method, user.user_id, order_id)
        .await?;
    Ok(created_response(created))
}

/// Capture an approved online payment
async fn capture_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path((method, order_id)): Path<(String, Uuid)>,
    Json(payload): Json<CaptureRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let method = PaymentStrategyRegistry::parse_method(&method)?;
    let captured = state
        .services
        .payments
        .capture(method, user.user_id, order_id, &payload.external_id)
        .await?;
    Ok(success_response(captured))
}

/// Mark an offline payment as collected
async fn complete_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path((method, order_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let method = PaymentStrategyRegistry::parse_method(&method)?;
    let transaction = state
        .services
        .payments
        .complete_offline(method, user.user_id, order_id)
        .await?;
    Ok(success_response(transaction))
}

async fn record_failure(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = state
        .services
        .payments
        .handle_failure(user.user_id, order_id)
        .await?;
    Ok(success_response(status))
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = state
        .services
        .payments
        .get_status(user.user_id, order_id)
        .await?;
    Ok(success_response(status))
}

use crate::handlers::common::{created_response, success_response};
use crate::{
    auth::AuthenticatedUser, errors::ServiceError, services::orders::ShippingAddressInput,
    AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders).post(checkout))
        .route("/:id", get(get_order))
        .route("/:id/shipping-address", put(set_shipping_address))
}

/// Turn the caller's cart into a PENDING order
async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .checkout
        .create_order_from_cart(user.user_id)
        .await?;
    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.list_orders(user.user_id).await?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(user.user_id, id).await?;
    Ok(success_response(order))
}

/// Attach a shipping address; an empty body falls back to the user's default
async fn set_shipping_address(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let input = parse_optional_body::<ShippingAddressInput>(&body)?;
    let order = state
        .services
        .orders
        .set_shipping_address(user.user_id, id, input)
        .await?;
    Ok(success_response(order))
}

fn parse_optional_body<T: serde::de::DeserializeOwned>(
    body: &[u8],
) -> Result<Option<T>, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ServiceError::ValidationError(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_body_means_no_address() {
        assert!(parse_optional_body::<ShippingAddressInput>(b"")
            .unwrap()
            .is_none());
        assert!(parse_optional_body::<ShippingAddressInput>(b"  \n")
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = parse_optional_body::<ShippingAddressInput>(b"{not json").unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn explicit_address_is_parsed() {
        let input = parse_optional_body::<ShippingAddressInput>(
            br#"{"line1":"1 Main St","city":"Austin","postal_code":"78701","country":"US"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(input.city.as_deref(), Some("Austin"));
    }
}

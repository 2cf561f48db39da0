//! Integration tests for order reads and shipping address assignment.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use stateset_checkout::{
    entities::OrderStatus, errors::ServiceError, services::orders::ShippingAddressInput,
};
use uuid::Uuid;

fn address() -> ShippingAddressInput {
    ShippingAddressInput {
        recipient: Some("Jordan Lee".into()),
        line1: Some("500 Market St".into()),
        line2: Some("Suite 4".into()),
        city: Some("San Francisco".into()),
        region: Some("CA".into()),
        postal_code: Some("94105".into()),
        country: Some("US".into()),
    }
}

#[tokio::test]
async fn explicit_address_is_stored_once() {
    let app = TestApp::new().await;
    let user = app.seed_user("ship@example.com").await;
    let detail = app.place_order(user.id, dec!(25.00), 2).await;
    let orders = &app.state.services.orders;

    let updated = orders
        .set_shipping_address(user.id, detail.order.id, Some(address()))
        .await
        .unwrap();
    assert_eq!(updated.shipping_city.as_deref(), Some("San Francisco"));
    assert_eq!(updated.status, OrderStatus::Pending);
    assert!(updated.version > detail.order.version);

    assert_matches!(
        orders
            .set_shipping_address(user.id, detail.order.id, Some(address()))
            .await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn missing_address_falls_back_to_the_user_default() {
    let app = TestApp::new().await;
    let user = app.seed_user_with_address("default@example.com").await;
    let detail = app.place_order(user.id, dec!(25.00), 1).await;

    let updated = app
        .state
        .services
        .orders
        .set_shipping_address(user.id, detail.order.id, None)
        .await
        .unwrap();
    assert_eq!(updated.shipping_line1.as_deref(), Some("12 Harbor Road"));
    assert_eq!(updated.shipping_recipient.as_deref(), Some("Avery Quinn"));
}

#[tokio::test]
async fn no_address_anywhere_is_rejected() {
    let app = TestApp::new().await;
    let user = app.seed_user("nowhere@example.com").await;
    let detail = app.place_order(user.id, dec!(25.00), 1).await;

    assert_matches!(
        app.state
            .services
            .orders
            .set_shipping_address(user.id, detail.order.id, Some(ShippingAddressInput::default()))
            .await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn incomplete_address_names_the_missing_fields() {
    let app = TestApp::new().await;
    let user = app.seed_user("partial@example.com").await;
    let detail = app.place_order(user.id, dec!(25.00), 1).await;

    let partial = ShippingAddressInput {
        city: None,
        postal_code: Some("  ".into()),
        ..address()
    };
    let err = app
        .state
        .services
        .orders
        .set_shipping_address(user.id, detail.order.id, Some(partial))
        .await
        .unwrap_err();
    match err {
        ServiceError::InvalidOperation(msg) => {
            assert!(msg.contains("city"), "{msg}");
            assert!(msg.contains("postal_code"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_country_fails_validation() {
    let app = TestApp::new().await;
    let user = app.seed_user("country@example.com").await;
    let detail = app.place_order(user.id, dec!(25.00), 1).await;

    let bad = ShippingAddressInput {
        country: Some("USA".into()),
        ..address()
    };
    assert_matches!(
        app.state
            .services
            .orders
            .set_shipping_address(user.id, detail.order.id, Some(bad))
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn address_cannot_be_set_after_payment_starts() {
    let app = TestApp::new().await;
    let user = app.seed_user("late@example.com").await;
    let detail = app.place_order(user.id, dec!(25.00), 1).await;

    app.state
        .services
        .payments
        .create_payment(
            stateset_checkout::entities::PaymentMethod::CashOnDelivery,
            user.id,
            detail.order.id,
        )
        .await
        .unwrap();

    assert_matches!(
        app.state
            .services
            .orders
            .set_shipping_address(user.id, detail.order.id, Some(address()))
            .await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner@example.com").await;
    let stranger = app.seed_user("stranger@example.com").await;
    let detail = app.place_order(owner.id, dec!(10.00), 1).await;
    let orders = &app.state.services.orders;

    let fetched = orders.get_order(owner.id, detail.order.id).await.unwrap();
    assert_eq!(fetched.items.len(), 1);

    assert_matches!(
        orders.get_order(stranger.id, detail.order.id).await,
        Err(ServiceError::Unauthorized(_))
    );
    assert_matches!(
        orders
            .set_shipping_address(stranger.id, detail.order.id, Some(address()))
            .await,
        Err(ServiceError::Unauthorized(_))
    );
    assert_matches!(
        orders.get_order(owner.id, Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(orders.list_orders(stranger.id).await.unwrap().is_empty());
}

use crate::handlers::common::{success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::AppServices,
    services::commerce::{CartKind, ContainerKind, ContainerService, RequestedLine, WishlistKind},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Picks the service for a container kind out of the shared services.
pub trait RoutedContainer: ContainerKind + Sized {
    fn service(services: &AppServices) -> &ContainerService<Self>;
}

impl RoutedContainer for CartKind {
    fn service(services: &AppServices) -> &ContainerService<Self> {
        &services.cart
    }
}

impl RoutedContainer for WishlistKind {
    fn service(services: &AppServices) -> &ContainerService<Self> {
        &services.wishlist
    }
}

/// Creates the router for the caller's cart
pub fn carts_routes() -> Router<Arc<AppState>> {
    container_routes::<CartKind>()
}

/// Creates the router for the caller's wishlist
pub fn wishlists_routes() -> Router<Arc<AppState>> {
    container_routes::<WishlistKind>()
}

fn container_routes<K: RoutedContainer>() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(get_container::<K>)
                .put(sync_container::<K>)
                .delete(clear_container::<K>),
        )
        .route("/items", post(add_item::<K>))
        .route("/items/:product_id", delete(remove_item::<K>))
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SyncRequest {
    pub items: Vec<RequestedLine>,
}

async fn get_container<K: RoutedContainer>(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let view = K::service(&state.services).get(user.user_id).await?;
    Ok(success_response(view))
}

/// Replace the container with a client snapshot
async fn sync_container<K: RoutedContainer>(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<SyncRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = K::service(&state.services)
        .sync_snapshot(user.user_id, payload.items)
        .await?;
    Ok(success_response(outcome))
}

async fn add_item<K: RoutedContainer>(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let view = K::service(&state.services)
        .add_or_increment(user.user_id, payload.product_id, payload.quantity)
        .await?;
    Ok(success_response(view))
}

async fn remove_item<K: RoutedContainer>(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = K::service(&state.services)
        .remove_item(user.user_id, product_id)
        .await?;
    Ok(success_response(view))
}

async fn clear_container<K: RoutedContainer>(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let view = K::service(&state.services).clear(user.user_id).await?;
    Ok(success_response(view))
}

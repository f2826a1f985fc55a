use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{no_content_response, success_response, validate_input},
    services::carts::AddToCartInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Cart endpoints. All of them act on the authenticated user's own cart.
pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/", delete(clear_cart))
        .route("/items", post(add_to_cart))
        .route("/items/:item_id", put(update_cart_item))
        .route("/items/:item_id", delete(remove_cart_item))
}

/// Current cart with items and computed summary
async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let cart = state.services.cart.get_or_create_cart(user.user_id).await?;
    Ok(success_response(cart))
}

/// Add item to cart
async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let input = AddToCartInput {
        variant_id: payload.variant_id,
        quantity: payload.quantity,
    };
    let cart = state.services.cart.add_item(user.user_id, input).await?;
    Ok(success_response(cart))
}

/// Update cart item quantity
async fn update_cart_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .update_item_quantity(user.user_id, item_id, payload.quantity)
        .await?;
    Ok(success_response(cart))
}

/// Remove item from cart
async fn remove_cart_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let cart = state.services.cart.remove_item(user.user_id, item_id).await?;
    Ok(success_response(cart))
}

/// Clear all items from cart
async fn clear_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    state.services.cart.clear_cart(user.user_id).await?;
    Ok(no_content_response())
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub variant_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
}

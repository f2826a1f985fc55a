use crate::{
    auth::AuthUser,
    entities::OrderStatus,
    errors::ServiceError,
    handlers::common::{
        created_response, success_response, PaginatedResponse, PaginationParams,
    },
    services::orders::CreateOrderInput,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Customer-facing order endpoints: checkout and order history.
pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
}

/// Back-office order endpoints, role-gated in the handlers.
pub fn admin_order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(admin_list_orders))
        .route("/:id/status", put(admin_update_status))
}

/// Checkout: create an order from the user's cart
async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let input = CreateOrderInput {
        shipping_address_id: payload.shipping_address_id,
        notes: payload.notes,
    };
    let order = state
        .services
        .orders
        .create_from_cart(user.user_id, input)
        .await?;
    Ok(created_response(order))
}

/// The user's order history, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders(user.user_id, params.page, params.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        params.page,
        params.per_page,
        total,
    )))
}

/// One order with its items
async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .get_order(id, user.user_id, user.is_admin())
        .await?;
    Ok(success_response(order))
}

/// All orders, filterable by status
async fn admin_list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<OrderStatusFilter>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;

    let (orders, total) = state
        .services
        .orders
        .list_all(params.page, params.per_page, filter.status)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        params.page,
        params.per_page,
        total,
    )))
}

/// Move an order along its lifecycle
async fn admin_update_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;

    let order = state
        .services
        .orders
        .update_status(id, payload.status)
        .await?;
    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

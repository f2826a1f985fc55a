use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{
        created_response, no_content_response, success_response, PaginatedResponse,
    },
    services::products::{CreateProductInput, CreateVariantInput, UpdateProductInput, UpdateVariantInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Public catalog endpoints.
pub fn product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

/// Back-office catalog endpoints, role-gated in the handlers.
pub fn admin_product_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(delete_product))
        .route("/products/:id/variants", post(create_variant))
        .route("/variants/:id", put(update_variant))
        .route("/variants/:id", delete(delete_variant))
        .route("/variants/:id/stock", put(set_variant_stock))
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub category_id: Option<Uuid>,
    pub q: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// Active products, paginated
async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProductsQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (products, total) = state
        .services
        .products
        .list_products(params.page, params.per_page, params.category_id, params.q)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        products,
        params.page,
        params.per_page,
        total,
    )))
}

/// One product with its active variants
async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(success_response(product))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let product = state.services.products.create_product(payload).await?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let product = state.services.products.update_product(id, payload).await?;
    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    state.services.products.delete_product(id).await?;
    Ok(no_content_response())
}

async fn create_variant(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let variant = state.services.products.create_variant(id, payload).await?;
    Ok(created_response(variant))
}

async fn update_variant(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVariantInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let variant = state.services.products.update_variant(id, payload).await?;
    Ok(success_response(variant))
}

async fn delete_variant(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    state.services.products.delete_variant(id).await?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock_count: i32,
}

async fn set_variant_stock(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStockRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let variant = state
        .services
        .products
        .set_variant_stock(id, payload.stock_count)
        .await?;
    Ok(success_response(variant))
}

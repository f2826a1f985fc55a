use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, success_response},
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn category_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_categories))
}

pub fn admin_category_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
}

/// Active categories for the storefront navigation
async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let categories = state.services.categories.list_categories().await?;
    Ok(success_response(categories))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let category = state.services.categories.create_category(payload).await?;
    Ok(created_response(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    let category = state
        .services
        .categories
        .update_category(id, payload)
        .await?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    user.require_admin()?;
    state.services.categories.delete_category(id).await?;
    Ok(no_content_response())
}

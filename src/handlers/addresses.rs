use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{created_response, no_content_response, success_response},
    services::addresses::AddressInput,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn address_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_addresses))
        .route("/", post(create_address))
        .route("/:id", put(update_address))
        .route("/:id", delete(delete_address))
}

async fn list_addresses(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let addresses = state.services.addresses.list_for_user(user.user_id).await?;
    Ok(success_response(addresses))
}

async fn create_address(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<AddressInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let address = state
        .services
        .addresses
        .create_address(user.user_id, payload)
        .await?;
    Ok(created_response(address))
}

async fn update_address(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressInput>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let address = state
        .services
        .addresses
        .update_address(user.user_id, id, payload)
        .await?;
    Ok(success_response(address))
}

async fn delete_address(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    state
        .services
        .addresses
        .delete_address(user.user_id, id)
        .await?;
    Ok(no_content_response())
}

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::common::{success_response, validate_input},
    services::payments::CardDetails,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Payment endpoints. `/test-cards` is deliberately unauthenticated so the
/// sandbox numbers can be fetched without an account.
pub fn payment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process", post(process_payment))
        .route("/status/:order_id", get(payment_status))
        .route("/test-cards", get(test_cards))
}

/// Run a payment attempt against an order through the mock gateway.
/// Succeeds with 200; declines and precondition violations come back 400.
async fn process_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<ProcessPaymentRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let card = CardDetails {
        card_holder_name: payload.card.card_holder_name,
        card_number: payload.card.card_number,
        expire_month: payload.card.expire_month,
        expire_year: payload.card.expire_year,
        cvc: payload.card.cvc,
    };

    let receipt = state
        .services
        .payments
        .process_payment(payload.order_id, user.user_id, card)
        .await?;

    Ok(success_response(receipt))
}

/// Latest payment attempt recorded for an order
async fn payment_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let payment = state
        .services
        .payments
        .payment_status(order_id, user.user_id, user.is_admin())
        .await?;

    Ok(success_response(payment))
}

/// The canned sandbox card numbers
async fn test_cards(
    State(state): State<Arc<AppState>>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    Ok(success_response(state.services.payments.test_cards()))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessPaymentRequest {
    pub order_id: Uuid,
    #[validate]
    pub card: CardRequest,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CardRequest {
    #[validate(length(min = 1, max = 255))]
    pub card_holder_name: String,
    #[validate(length(min = 12, max = 23))]
    pub card_number: String,
    pub expire_month: u32,
    pub expire_year: i32,
    // Accepted but never checked or stored.
    pub cvc: String,
}

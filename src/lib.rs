//! Nutriline API Library
//!
//! Backend for the Nutriline supplement storefront: catalog, per-user
//! carts, checkout, a mock card-payment gateway and the order back office.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// The versioned API surface. Admin routers are nested under `/admin` and
/// role-gated inside their handlers.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    let admin = Router::new()
        .nest(
            "/categories",
            handlers::categories::admin_category_routes(),
        )
        .nest("/orders", handlers::orders::admin_order_routes())
        .merge(handlers::products::admin_product_routes());

    Router::new()
        .nest("/categories", handlers::categories::category_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/cart", handlers::carts::cart_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/addresses", handlers::addresses::address_routes())
        .nest("/payment", handlers::payments::payment_routes())
        .nest("/admin", admin)
}

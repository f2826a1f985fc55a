pub mod addresses;
pub mod carts;
pub mod categories;
pub mod common;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        AddressService, CartService, CategoryService, OrderService, PaymentService, ProductService,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Aggregate of the services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub cart: CartService,
    pub payments: PaymentService,
    pub orders: OrderService,
    pub products: ProductService,
    pub categories: CategoryService,
    pub addresses: AddressService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            cart: CartService::new(db.clone(), event_sender.clone(), config.clone()),
            payments: PaymentService::new(db.clone(), event_sender.clone(), config),
            orders: OrderService::new(db.clone(), event_sender.clone()),
            products: ProductService::new(db.clone(), event_sender),
            categories: CategoryService::new(db.clone()),
            addresses: AddressService::new(db),
        }
    }
}

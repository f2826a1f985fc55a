use crate::{
    entities::{
        cart, cart_item, order, order_item, Address, Cart, CartItem, Order, OrderItem, OrderModel,
        OrderStatus, PaymentState, Product, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Order service: checkout plus the admin-facing lifecycle updates.
///
/// Orders are historical records; nothing here deletes one. Checkout
/// converts the user's cart into an order inside a single transaction,
/// snapshotting variant prices and decrementing stock, so later catalog
/// edits never touch a placed order.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an order from the user's cart and empties the cart.
    #[instrument(skip(self))]
    pub async fn create_from_cart(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::InvalidOperation("Cart is empty".to_string()))?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(ProductVariant)
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        if let Some(address_id) = input.shipping_address_id {
            let addr = Address::find_by_id(address_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Address {} not found", address_id))
                })?;
            if addr.user_id != user_id {
                return Err(ServiceError::InvalidOperation(
                    "Address does not belong to this user".to_string(),
                ));
            }
        }

        let order_id = Uuid::new_v4();
        let mut subtotal = Decimal::ZERO;
        let mut total = Decimal::ZERO;
        let mut item_rows = Vec::with_capacity(lines.len());

        for (line, variant) in lines {
            let variant = variant.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart item {} references a missing variant",
                    line.id
                ))
            })?;

            let product = variant.find_related(Product).one(&txn).await?.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Variant {} references a missing product",
                    variant.id
                ))
            })?;

            if !variant.is_active || !product.is_active {
                return Err(ServiceError::InvalidOperation(format!(
                    "{} is no longer available",
                    variant.name
                )));
            }

            if line.quantity > variant.stock_count {
                return Err(ServiceError::InsufficientStock(format!(
                    "Only {} units of {} in stock",
                    variant.stock_count, variant.sku
                )));
            }

            let discounted = variant.discounted_price();
            let quantity = Decimal::from(line.quantity);
            subtotal += variant.price * quantity;
            total += discounted * quantity;

            item_rows.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                variant_id: Set(variant.id),
                product_name: Set(product.name),
                variant_name: Set(variant.name.clone()),
                sku: Set(variant.sku.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(variant.price),
                discounted_unit_price: Set(discounted),
                line_total: Set(discounted * quantity),
                created_at: Set(Utc::now()),
            });

            // Reserve stock inside the same transaction as the checkout.
            let new_stock = variant.stock_count - line.quantity;
            let mut variant_update: crate::entities::product_variant::ActiveModel =
                variant.into();
            variant_update.stock_count = Set(new_stock);
            variant_update.updated_at = Set(Utc::now());
            variant_update.update(&txn).await?;
        }

        let order_row = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!(
                "ORD-{}",
                order_id.to_string()[..8].to_uppercase()
            )),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            payment_state: Set(PaymentState::Unpaid),
            currency: Set(cart.currency.clone()),
            subtotal: Set(subtotal),
            total_amount: Set(total),
            shipping_address_id: Set(input.shipping_address_id),
            notes: Set(input.notes),
            paid_at: Set(None),
            shipped_at: Set(None),
            delivered_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let order_row = order_row.insert(&txn).await?;

        for item in item_rows {
            item.insert(&txn).await?;
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;

        info!(
            "Order {} created for user {} from cart {}",
            order_row.order_number, user_id, cart.id
        );
        self.get_order(order_id, user_id, false).await
    }

    /// Fetches one order with its items. Foreign orders are reported as
    /// absent rather than forbidden, so ids cannot be probed.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_id != user_id && !is_admin {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }

        let items = order.find_related(OrderItem).all(&*self.db).await?;
        Ok(OrderWithItems { order, items })
    }

    /// The user's own orders, newest first.
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// All orders for the back office, optionally filtered by status.
    pub async fn list_all(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query.paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Moves an order along its lifecycle, stamping the matching timestamp.
    /// Rejects anything `OrderStatus::can_transition_to` does not allow.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot transition order from {} to {}",
                old_status, new_status
            )));
        }

        let now = Utc::now();
        let mut update: order::ActiveModel = order.into();
        update.status = Set(new_status);
        match new_status {
            OrderStatus::Shipped => update.shipped_at = Set(Some(now)),
            OrderStatus::Delivered => update.delivered_at = Set(Some(now)),
            OrderStatus::Cancelled => update.cancelled_at = Set(Some(now)),
            _ => {}
        }
        update.updated_at = Set(now);
        let order = update.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        info!(
            "Order {} moved from {} to {}",
            order.order_number, old_status, new_status
        );
        Ok(order)
    }
}

/// Input for creating an order at checkout
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub shipping_address_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Order with its line items
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<order_item::Model>,
}

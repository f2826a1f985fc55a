use crate::{
    config::AppConfig,
    entities::{
        cart, cart_item, Cart, CartItem, CartModel, Product, ProductVariant, ProductVariantModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service.
///
/// Each user owns exactly one cart, created lazily on first access and kept
/// across sessions. Every quantity-changing operation re-reads the variant's
/// stock inside the same transaction as the write, so a single request can
/// never push a line past the stock the database saw.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Returns the user's cart with its lines and computed summary,
    /// creating an empty cart on first access. Idempotent.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = match self.find_cart(&*self.db, user_id).await? {
            Some(cart) => cart,
            None => self.create_cart(&*self.db, user_id).await?,
        };

        self.load_cart_view(&*self.db, cart).await
    }

    /// Adds a variant to the user's cart, or bumps the existing line.
    ///
    /// Fails with `NotFound` when the variant does not exist, and with a
    /// 400-mapped error when the variant or its product is inactive or the
    /// combined quantity would exceed the variant's stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = match self.find_cart(&txn, user_id).await? {
            Some(cart) => cart,
            None => self.create_cart(&txn, user_id).await?,
        };

        let variant = self.load_purchasable_variant(&txn, input.variant_id).await?;

        let existing_item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::VariantId.eq(input.variant_id))
            .one(&txn)
            .await?;

        let existing_quantity = existing_item.as_ref().map_or(0, |item| item.quantity);
        let requested = existing_quantity + input.quantity;
        if requested > variant.stock_count {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} units of {} in stock",
                variant.stock_count, variant.sku
            )));
        }

        if let Some(item) = existing_item {
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(requested);
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                variant_id: Set(input.variant_id),
                quantity: Set(input.quantity),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let cart = self.touch_cart(&txn, cart).await?;
        let view = self.load_cart_view(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: view.cart.id,
                variant_id: input.variant_id,
            })
            .await;

        info!(
            "Added to cart {}: variant {} x{}",
            view.cart.id, input.variant_id, input.quantity
        );
        Ok(view)
    }

    /// Sets the quantity of an existing line, re-checking stock.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let (item, cart) = self.find_owned_item(&txn, user_id, item_id).await?;

        let variant = ProductVariant::find_by_id(item.variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", item.variant_id))
            })?;

        if quantity > variant.stock_count {
            return Err(ServiceError::InsufficientStock(format!(
                "Only {} units of {} in stock",
                variant.stock_count, variant.sku
            )));
        }

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        let cart = self.touch_cart(&txn, cart).await?;
        let view = self.load_cart_view(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: view.cart.id,
                item_id,
            })
            .await;

        Ok(view)
    }

    /// Removes a single line from the user's cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let (item, cart) = self.find_owned_item(&txn, user_id, item_id).await?;
        item.delete(&txn).await?;

        let cart = self.touch_cart(&txn, cart).await?;
        let view = self.load_cart_view(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: view.cart.id,
                item_id,
            })
            .await;

        Ok(view)
    }

    /// Deletes every line of the user's cart. Clearing a cart that was
    /// never created succeeds.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let Some(cart) = self.find_cart(&*self.db, user_id).await? else {
            return Ok(());
        };

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(cart.id)).await;

        info!("Cleared cart: {}", cart.id);
        Ok(())
    }

    async fn find_cart(
        &self,
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<Option<CartModel>, ServiceError> {
        Ok(Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?)
    }

    async fn create_cart(
        &self,
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            currency: Set(self.config.default_currency.clone()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let cart = cart.insert(conn).await?;

        self.event_sender.send_or_log(Event::CartCreated(cart.id)).await;

        info!("Created cart {} for user {}", cart.id, user_id);
        Ok(cart)
    }

    /// Loads a variant and enforces that it can currently be bought.
    async fn load_purchasable_variant(
        &self,
        conn: &impl ConnectionTrait,
        variant_id: Uuid,
    ) -> Result<ProductVariantModel, ServiceError> {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let product = variant
            .find_related(Product)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product for variant {} not found", variant_id))
            })?;

        if !variant.is_active || !product.is_active {
            return Err(ServiceError::InvalidOperation(
                "Product is not available for purchase".to_string(),
            ));
        }

        Ok(variant)
    }

    /// Finds a cart line and verifies it belongs to the requesting user.
    async fn find_owned_item(
        &self,
        conn: &impl ConnectionTrait,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<(cart_item::Model, CartModel), ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let cart = Cart::find_by_id(item.cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", item.cart_id)))?;

        if cart.user_id != user_id {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to your cart".to_string(),
            ));
        }

        Ok((item, cart))
    }

    async fn touch_cart(
        &self,
        conn: &impl ConnectionTrait,
        cart: CartModel,
    ) -> Result<CartModel, ServiceError> {
        let mut cart: cart::ActiveModel = cart.into();
        cart.updated_at = Set(Utc::now());
        Ok(cart.update(conn).await?)
    }

    async fn load_cart_view(
        &self,
        conn: &impl ConnectionTrait,
        cart: CartModel,
    ) -> Result<CartWithItems, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(ProductVariant)
            .all(conn)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (item, variant) in rows {
            let variant = variant.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart item {} references a missing variant",
                    item.id
                ))
            })?;
            items.push(CartLine::from_parts(item, &variant));
        }

        let summary = CartSummary::compute(&items);
        Ok(CartWithItems {
            cart,
            items,
            summary,
        })
    }
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub variant_id: Uuid,
    pub quantity: i32,
}

/// One cart line joined with its variant's current pricing.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discounted_unit_price: Decimal,
    pub line_total: Decimal,
}

impl CartLine {
    fn from_parts(item: cart_item::Model, variant: &ProductVariantModel) -> Self {
        let discounted = variant.discounted_price();
        Self {
            id: item.id,
            variant_id: item.variant_id,
            sku: variant.sku.clone(),
            name: variant.name.clone(),
            quantity: item.quantity,
            unit_price: variant.price,
            discounted_unit_price: discounted,
            line_total: discounted * Decimal::from(item.quantity),
        }
    }
}

/// Computed cart totals: list-price subtotal and discounted total.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub item_count: i32,
    pub subtotal: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    fn compute(items: &[CartLine]) -> Self {
        let item_count = items.iter().map(|line| line.quantity).sum();
        let subtotal = items
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();
        let total = items.iter().map(|line| line.line_total).sum();
        Self {
            item_count,
            subtotal,
            total,
        }
    }
}

/// Cart with items and summary
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartLine>,
    pub summary: CartSummary,
}

use crate::{
    entities::{
        product, product_variant, Category, Product, ProductModel, ProductVariant,
        ProductVariantModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Catalog service backing both the storefront listing and the admin
/// back office.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Active products for the storefront, newest first, optionally
    /// filtered by category or a name substring.
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        category_id: Option<Uuid>,
        query: Option<String>,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut select = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt);

        if let Some(category_id) = category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(q) = query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            select = select.filter(product::Column::Name.contains(q));
        }

        let paginator = select.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// One product with its purchasable variants. The storefront never
    /// sees inactive products or variants.
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductWithVariants, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let variants = product
            .find_related(ProductVariant)
            .filter(product_variant::Column::IsActive.eq(true))
            .order_by_asc(product_variant::Column::Position)
            .all(&*self.db)
            .await?;

        Ok(ProductWithVariants { product, variants })
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        if let Some(category_id) = input.category_id {
            Category::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let existing = Product::find()
            .filter(product::Column::Slug.eq(input.slug.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "A product with slug '{}' already exists",
                input.slug
            )));
        }

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            category_id: Set(input.category_id),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            brand: Set(input.brand),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product.id))
            .await;

        info!("Created product {} ({})", product.id, product.slug);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(category_id) = input.category_id {
            Category::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let mut update: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            update.name = Set(name);
        }
        if let Some(slug) = input.slug {
            update.slug = Set(slug);
        }
        if let Some(description) = input.description {
            update.description = Set(description);
        }
        if input.brand.is_some() {
            update.brand = Set(input.brand);
        }
        if input.category_id.is_some() {
            update.category_id = Set(input.category_id);
        }
        if let Some(is_active) = input.is_active {
            update.is_active = Set(is_active);
        }
        update.updated_at = Set(Utc::now());
        let product = update.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product.id))
            .await;

        Ok(product)
    }

    /// Hard delete; variants go with the product via the FK cascade.
    /// Placed orders are unaffected because order items are snapshots.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        product.delete(&*self.db).await?;
        info!("Deleted product {}", product_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;

        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = ProductVariant::find()
            .filter(product_variant::Column::Sku.eq(input.sku.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "A variant with SKU '{}' already exists",
                input.sku
            )));
        }

        let variant = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            sku: Set(input.sku),
            name: Set(input.name),
            aroma: Set(input.aroma),
            size: Set(input.size),
            price: Set(input.price),
            discount_percent: Set(input.discount_percent),
            stock_count: Set(input.stock_count),
            is_active: Set(true),
            position: Set(input.position.unwrap_or(0)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let variant = variant.insert(&*self.db).await?;

        info!("Created variant {} ({})", variant.id, variant.sku);
        Ok(variant)
    }

    #[instrument(skip(self))]
    pub async fn update_variant(
        &self,
        variant_id: Uuid,
        input: UpdateVariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;

        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let mut update: product_variant::ActiveModel = variant.into();
        if let Some(name) = input.name {
            update.name = Set(name);
        }
        if input.aroma.is_some() {
            update.aroma = Set(input.aroma);
        }
        if input.size.is_some() {
            update.size = Set(input.size);
        }
        if let Some(price) = input.price {
            update.price = Set(price);
        }
        if input.discount_percent.is_some() {
            update.discount_percent = Set(input.discount_percent);
        }
        if let Some(stock_count) = input.stock_count {
            update.stock_count = Set(stock_count);
        }
        if let Some(is_active) = input.is_active {
            update.is_active = Set(is_active);
        }
        if let Some(position) = input.position {
            update.position = Set(position);
        }
        update.updated_at = Set(Utc::now());

        Ok(update.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        variant.delete(&*self.db).await?;
        info!("Deleted variant {}", variant_id);
        Ok(())
    }

    /// Absolute stock set, used by the back office after a recount.
    #[instrument(skip(self))]
    pub async fn set_variant_stock(
        &self,
        variant_id: Uuid,
        stock_count: i32,
    ) -> Result<ProductVariantModel, ServiceError> {
        if stock_count < 0 {
            return Err(ServiceError::InvalidInput(
                "Stock count cannot be negative".to_string(),
            ));
        }

        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let mut update: product_variant::ActiveModel = variant.into();
        update.stock_count = Set(stock_count);
        update.updated_at = Set(Utc::now());
        let variant = update.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::VariantStockAdjusted {
                variant_id,
                stock_count,
            })
            .await;

        Ok(variant)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVariantInput {
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub aroma: Option<String>,
    pub size: Option<String>,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_count: i32,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVariantInput {
    pub name: Option<String>,
    pub aroma: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_count: Option<i32>,
    pub is_active: Option<bool>,
    pub position: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ProductWithVariants {
    pub product: ProductModel,
    pub variants: Vec<ProductVariantModel>,
}

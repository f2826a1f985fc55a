use crate::{
    entities::{category, Category, CategoryModel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Category CRUD for the admin back office and the storefront listing.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let existing = Category::find()
            .filter(category::Column::Slug.eq(input.slug.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "A category with slug '{}' already exists",
                input.slug
            )));
        }

        let cat = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let cat = cat.insert(&*self.db).await?;

        info!("Created category {} ({})", cat.id, cat.slug);
        Ok(cat)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        let cat = Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", category_id))
            })?;

        let mut update: category::ActiveModel = cat.into();
        if let Some(name) = input.name {
            update.name = Set(name);
        }
        if let Some(slug) = input.slug {
            update.slug = Set(slug);
        }
        if input.description.is_some() {
            update.description = Set(input.description);
        }
        if let Some(is_active) = input.is_active {
            update.is_active = Set(is_active);
        }
        update.updated_at = Set(Utc::now());

        Ok(update.update(&*self.db).await?)
    }

    /// Hard delete. Products keep existing with their category unset
    /// through the FK's SET NULL.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let cat = Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", category_id))
            })?;

        cat.delete(&*self.db).await?;
        info!("Deleted category {}", category_id);
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

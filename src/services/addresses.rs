use crate::{
    entities::{address, Address, AddressModel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Shipping address CRUD, ownership-checked on every mutation.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AddressModel>, ServiceError> {
        Ok(Address::find()
            .filter(address::Column::UserId.eq(user_id))
            .order_by_desc(address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn create_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;

        let addr = address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            label: Set(input.label),
            recipient: Set(input.recipient),
            phone: Set(input.phone),
            country: Set(input.country),
            city: Set(input.city),
            postal_code: Set(input.postal_code),
            line1: Set(input.line1),
            line2: Set(input.line2),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(addr.insert(&*self.db).await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<AddressModel, ServiceError> {
        input.validate()?;
        let addr = self.find_owned(user_id, address_id).await?;

        let mut update: address::ActiveModel = addr.into();
        update.label = Set(input.label);
        update.recipient = Set(input.recipient);
        update.phone = Set(input.phone);
        update.country = Set(input.country);
        update.city = Set(input.city);
        update.postal_code = Set(input.postal_code);
        update.line1 = Set(input.line1);
        update.line2 = Set(input.line2);
        update.updated_at = Set(Utc::now());

        Ok(update.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_address(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let addr = self.find_owned(user_id, address_id).await?;
        addr.delete(&*self.db).await?;
        Ok(())
    }

    async fn find_owned(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<AddressModel, ServiceError> {
        let addr = Address::find_by_id(address_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))?;

        if addr.user_id != user_id {
            return Err(ServiceError::InvalidOperation(
                "Address does not belong to this user".to_string(),
            ));
        }
        Ok(addr)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 100))]
    pub label: String,
    #[validate(length(min = 1, max = 255))]
    pub recipient: String,
    #[validate(length(min = 1, max = 30))]
    pub phone: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 500))]
    pub line1: String,
    pub line2: Option<String>,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product variant entity: one aroma/size combination with its own price
/// and stock. This is the unit of purchase.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    #[sea_orm(nullable)]
    pub aroma: Option<String>,
    #[sea_orm(nullable)]
    pub size: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub discount_percent: Option<Decimal>,
    pub stock_count: i32,
    pub is_active: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Unit price with the variant discount applied, when one is set.
    pub fn discounted_price(&self) -> Decimal {
        match self.discount_percent {
            Some(pct) if pct > Decimal::ZERO => {
                self.price * (Decimal::ONE_HUNDRED - pct) / Decimal::ONE_HUNDRED
            }
            _ => self.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn variant(price: Decimal, discount: Option<Decimal>) -> Model {
        Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            sku: "WHEY-CHOC-1KG".into(),
            name: "Chocolate / 1 kg".into(),
            aroma: Some("Chocolate".into()),
            size: Some("1 kg".into()),
            price,
            discount_percent: discount,
            stock_count: 10,
            is_active: true,
            position: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn discounted_price_without_discount_is_list_price() {
        let v = variant(dec!(29.90), None);
        assert_eq!(v.discounted_price(), dec!(29.90));
    }

    #[test]
    fn discounted_price_applies_percentage() {
        let v = variant(dec!(100.00), Some(dec!(25)));
        assert_eq!(v.discounted_price(), dec!(75.00));
    }

    #[test]
    fn zero_discount_is_ignored() {
        let v = variant(dec!(19.99), Some(Decimal::ZERO));
        assert_eq!(v.discounted_price(), dec!(19.99));
    }
}

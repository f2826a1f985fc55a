use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Payment attempt entity. One append-only row per call to the mock
/// gateway. Only masked card data is kept: BIN and last four digits.
/// The full PAN and the CVC are discarded before this row is built.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway_payment_id: String,
    pub conversation_id: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    pub card_association: CardAssociation,
    pub card_type: String,
    pub card_holder: String,
    pub bin: String,
    pub last_four: String,
    pub status: PaymentStatus,
    #[sea_orm(column_type = "Json")]
    pub gateway_response: Json,
    #[sea_orm(nullable)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Card scheme classified from the leading digits of the PAN.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CardAssociation {
    #[sea_orm(string_value = "VISA")]
    #[serde(rename = "VISA")]
    Visa,
    #[sea_orm(string_value = "MASTER_CARD")]
    #[serde(rename = "MASTER_CARD")]
    MasterCard,
    #[sea_orm(string_value = "AMERICAN_EXPRESS")]
    #[serde(rename = "AMERICAN_EXPRESS")]
    AmericanExpress,
    #[sea_orm(string_value = "UNKNOWN")]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

/// Outcome of a single gateway attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
    #[sea_orm(string_value = "failed")]
    Failed,
}

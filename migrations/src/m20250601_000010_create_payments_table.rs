use sea_orm_migration::prelude::*;

use super::m20250601_000008_create_orders_table::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Payments::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(Payments::GatewayPaymentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::ConversationId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::Amount)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Currency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(Payments::CardAssociation)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::CardType).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Payments::CardHolder)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Bin).string_len(6).not_null())
                    .col(ColumnDef::new(Payments::LastFour).string_len(4).not_null())
                    .col(ColumnDef::new(Payments::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Payments::GatewayResponse)
                            .json()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::ErrorMessage).text().null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_order_id")
                            .from(Payments::Table, Payments::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_order_id")
                    .table(Payments::Table)
                    .col(Payments::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Payments {
    Table,
    Id,
    OrderId,
    GatewayPaymentId,
    ConversationId,
    Amount,
    Currency,
    CardAssociation,
    CardType,
    CardHolder,
    Bin,
    LastFour,
    Status,
    GatewayResponse,
    ErrorMessage,
    CreatedAt,
}

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_users_table::Users;
use super::m20250601_000007_create_addresses_table::Addresses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Orders::OrderNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentState)
                            .string_len(20)
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(Orders::Currency)
                            .string_len(3)
                            .not_null()
                            .default("USD"),
                    )
                    .col(
                        ColumnDef::new(Orders::Subtotal)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::TotalAmount)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::ShippingAddressId).uuid().null())
                    .col(ColumnDef::new(Orders::Notes).text().null())
                    .col(ColumnDef::new(Orders::PaidAt).timestamp().null())
                    .col(ColumnDef::new(Orders::ShippedAt).timestamp().null())
                    .col(ColumnDef::new(Orders::DeliveredAt).timestamp().null())
                    .col(ColumnDef::new(Orders::CancelledAt).timestamp().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_user_id")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_shipping_address_id")
                            .from(Orders::Table, Orders::ShippingAddressId)
                            .to(Addresses::Table, Addresses::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    Status,
    PaymentState,
    Currency,
    Subtotal,
    TotalAmount,
    ShippingAddressId,
    Notes,
    PaidAt,
    ShippedAt,
    DeliveredAt,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}

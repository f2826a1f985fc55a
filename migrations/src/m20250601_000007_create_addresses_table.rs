use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Addresses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Addresses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Addresses::UserId).uuid().not_null())
                    .col(ColumnDef::new(Addresses::Label).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Addresses::Recipient)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Addresses::Phone).string_len(30).not_null())
                    .col(ColumnDef::new(Addresses::Country).string_len(100).not_null())
                    .col(ColumnDef::new(Addresses::City).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Addresses::PostalCode)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Addresses::Line1).string_len(500).not_null())
                    .col(ColumnDef::new(Addresses::Line2).string_len(500).null())
                    .col(ColumnDef::new(Addresses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Addresses::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_addresses_user_id")
                            .from(Addresses::Table, Addresses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_addresses_user_id")
                    .table(Addresses::Table)
                    .col(Addresses::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Addresses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Addresses {
    Table,
    Id,
    UserId,
    Label,
    Recipient,
    Phone,
    Country,
    City,
    PostalCode,
    Line1,
    Line2,
    CreatedAt,
    UpdatedAt,
}

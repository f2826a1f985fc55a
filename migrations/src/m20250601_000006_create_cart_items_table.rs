use sea_orm_migration::prelude::*;

use super::m20250601_000004_create_product_variants_table::ProductVariants;
use super::m20250601_000005_create_carts_table::Carts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CartItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CartItems::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                    .col(ColumnDef::new(CartItems::VariantId).uuid().not_null())
                    .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(CartItems::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(CartItems::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_items_cart_id")
                            .from(CartItems::Table, CartItems::CartId)
                            .to(Carts::Table, Carts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_items_variant_id")
                            .from(CartItems::Table, CartItems::VariantId)
                            .to(ProductVariants::Table, ProductVariants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One line per (cart, variant); add-to-cart sums quantities instead.
        manager
            .create_index(
                Index::create()
                    .name("idx_cart_items_cart_id_variant_id")
                    .table(CartItems::Table)
                    .col(CartItems::CartId)
                    .col(CartItems::VariantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CartItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CartItems {
    Table,
    Id,
    CartId,
    VariantId,
    Quantity,
    CreatedAt,
    UpdatedAt,
}

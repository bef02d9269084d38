use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inventories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventories::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Inventories::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Inventories::Description).text().null())
                    .col(ColumnDef::new(Inventories::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Inventories::CustomIdFormat)
                            .string_len(255)
                            .null(),
                    )
                    // Optimistic lock for field layout and template edits
                    .col(
                        ColumnDef::new(Inventories::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Inventories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventories_owner_id")
                    .table(Inventories::Table)
                    .col(Inventories::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryAccess::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryAccess::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryAccess::InventoryId).uuid().not_null())
                    .col(ColumnDef::new(InventoryAccess::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryAccess::CanWrite)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryAccess::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_access_inventory")
                            .from(InventoryAccess::Table, InventoryAccess::InventoryId)
                            .to(Inventories::Table, Inventories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_inventory_access_user")
                    .table(InventoryAccess::Table)
                    .col(InventoryAccess::InventoryId)
                    .col(InventoryAccess::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryAccess::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
    Title,
    Description,
    OwnerId,
    CustomIdFormat,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryAccess {
    Table,
    Id,
    InventoryId,
    UserId,
    CanWrite,
    CreatedAt,
}

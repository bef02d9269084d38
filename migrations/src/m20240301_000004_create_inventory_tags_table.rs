use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryTags::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTags::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryTags::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(InventoryTags::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_inventory_tags_name")
                    .table(InventoryTags::Table)
                    .col(InventoryTags::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Tags are shared between inventories
        manager
            .create_table(
                Table::create()
                    .table(InventoryHasTag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(InventoryHasTag::InventoryId).uuid().not_null())
                    .col(ColumnDef::new(InventoryHasTag::TagId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(InventoryHasTag::InventoryId)
                            .col(InventoryHasTag::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_has_tag_inventory")
                            .from(InventoryHasTag::Table, InventoryHasTag::InventoryId)
                            .to(Inventories::Table, Inventories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_has_tag_tag")
                            .from(InventoryHasTag::Table, InventoryHasTag::TagId)
                            .to(InventoryTags::Table, InventoryTags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_has_tag_tag_id")
                    .table(InventoryHasTag::Table)
                    .col(InventoryHasTag::TagId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryHasTag::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InventoryTags::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum InventoryTags {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InventoryHasTag {
    Table,
    InventoryId,
    TagId,
}

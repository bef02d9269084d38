use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryFields::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryFields::InventoryId).uuid().not_null())
                    .col(ColumnDef::new(InventoryFields::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(InventoryFields::FieldType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryFields::Slot).string_len(20).not_null())
                    .col(
                        ColumnDef::new(InventoryFields::OrderIndex)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryFields::Required)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InventoryFields::ShowInSummary)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(InventoryFields::Description).text().null())
                    .col(
                        ColumnDef::new(InventoryFields::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_fields_inventory")
                            .from(InventoryFields::Table, InventoryFields::InventoryId)
                            .to(Inventories::Table, Inventories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Two concurrent allocations of the same slot are settled here
        manager
            .create_index(
                Index::create()
                    .name("uniq_inventory_fields_slot")
                    .table(InventoryFields::Table)
                    .col(InventoryFields::InventoryId)
                    .col(InventoryFields::Slot)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_inventory_fields_name")
                    .table(InventoryFields::Table)
                    .col(InventoryFields::InventoryId)
                    .col(InventoryFields::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryFields::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum InventoryFields {
    Table,
    Id,
    InventoryId,
    Name,
    FieldType,
    Slot,
    OrderIndex,
    Required,
    ShowInSummary,
    Description,
    CreatedAt,
}

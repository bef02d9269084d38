use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryItems::InventoryId).uuid().not_null())
                    .col(ColumnDef::new(InventoryItems::CustomId).string_len(255).not_null())
                    .col(ColumnDef::new(InventoryItems::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryItems::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // Fixed value slots, three per family
                    .col(ColumnDef::new(InventoryItems::Text1).string_len(255).null())
                    .col(ColumnDef::new(InventoryItems::Text2).string_len(255).null())
                    .col(ColumnDef::new(InventoryItems::Text3).string_len(255).null())
                    .col(ColumnDef::new(InventoryItems::LongText1).text().null())
                    .col(ColumnDef::new(InventoryItems::LongText2).text().null())
                    .col(ColumnDef::new(InventoryItems::LongText3).text().null())
                    .col(ColumnDef::new(InventoryItems::Number1).double().null())
                    .col(ColumnDef::new(InventoryItems::Number2).double().null())
                    .col(ColumnDef::new(InventoryItems::Number3).double().null())
                    .col(ColumnDef::new(InventoryItems::Bool1).boolean().null())
                    .col(ColumnDef::new(InventoryItems::Bool2).boolean().null())
                    .col(ColumnDef::new(InventoryItems::Bool3).boolean().null())
                    .col(ColumnDef::new(InventoryItems::Link1).string_len(1024).null())
                    .col(ColumnDef::new(InventoryItems::Link2).string_len(1024).null())
                    .col(ColumnDef::new(InventoryItems::Link3).string_len(1024).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_items_inventory")
                            .from(InventoryItems::Table, InventoryItems::InventoryId)
                            .to(Inventories::Table, Inventories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_inventory_items_custom_id")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::InventoryId)
                    .col(InventoryItems::CustomId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemLikes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ItemLikes::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(ItemLikes::ItemId).uuid().not_null())
                    .col(ColumnDef::new(ItemLikes::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ItemLikes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_likes_item")
                            .from(ItemLikes::Table, ItemLikes::ItemId)
                            .to(InventoryItems::Table, InventoryItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_item_likes_user")
                    .table(ItemLikes::Table)
                    .col(ItemLikes::ItemId)
                    .col(ItemLikes::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ItemLikes::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum InventoryItems {
    Table,
    Id,
    InventoryId,
    CustomId,
    CreatedBy,
    Version,
    CreatedAt,
    UpdatedAt,
    #[sea_orm(iden = "text1")]
    Text1,
    #[sea_orm(iden = "text2")]
    Text2,
    #[sea_orm(iden = "text3")]
    Text3,
    #[sea_orm(iden = "long_text1")]
    LongText1,
    #[sea_orm(iden = "long_text2")]
    LongText2,
    #[sea_orm(iden = "long_text3")]
    LongText3,
    #[sea_orm(iden = "number1")]
    Number1,
    #[sea_orm(iden = "number2")]
    Number2,
    #[sea_orm(iden = "number3")]
    Number3,
    #[sea_orm(iden = "bool1")]
    Bool1,
    #[sea_orm(iden = "bool2")]
    Bool2,
    #[sea_orm(iden = "bool3")]
    Bool3,
    #[sea_orm(iden = "link1")]
    Link1,
    #[sea_orm(iden = "link2")]
    Link2,
    #[sea_orm(iden = "link3")]
    Link3,
}

#[derive(DeriveIden)]
enum ItemLikes {
    Table,
    Id,
    ItemId,
    UserId,
    CreatedAt,
}

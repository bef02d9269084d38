pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_inventories_table;
mod m20240301_000002_create_inventory_fields_table;
mod m20240301_000003_create_inventory_items_table;
mod m20240301_000004_create_inventory_tags_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_inventories_table::Migration),
            Box::new(m20240301_000002_create_inventory_fields_table::Migration),
            Box::new(m20240301_000003_create_inventory_items_table::Migration),
            Box::new(m20240301_000004_create_inventory_tags_table::Migration),
        ]
    }
}

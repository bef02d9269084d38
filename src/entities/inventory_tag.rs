use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Free-form label shared by every inventory that uses it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_has_tag::Entity")]
    InventoryLinks,
}

impl Related<super::inventory_has_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

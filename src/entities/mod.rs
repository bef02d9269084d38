pub mod inventory;
pub mod inventory_access;
pub mod inventory_field;
pub mod inventory_has_tag;
pub mod inventory_item;
pub mod inventory_tag;
pub mod item_like;

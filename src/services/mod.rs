pub mod access;
pub mod custom_id;
pub mod fields;
pub mod inventories;
pub mod items;

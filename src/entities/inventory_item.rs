use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::slots::{FieldType, ItemValueRecord, SlotId};

/// An inventory item row. The value slots are fixed columns, three per
/// family, matching `slots::SLOTS_PER_FAMILY`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub custom_id: String,
    pub created_by: Uuid,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,

    pub text1: Option<String>,
    pub text2: Option<String>,
    pub text3: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_text1: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_text2: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub long_text3: Option<String>,
    pub number1: Option<f64>,
    pub number2: Option<f64>,
    pub number3: Option<f64>,
    pub bool1: Option<bool>,
    pub bool2: Option<bool>,
    pub bool3: Option<bool>,
    pub link1: Option<String>,
    pub link2: Option<String>,
    pub link3: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory::Entity",
        from = "Column::InventoryId",
        to = "super::inventory::Column::Id",
        on_delete = "Cascade"
    )]
    Inventory,
    #[sea_orm(has_many = "super::item_like::Entity")]
    Likes,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::item_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Copies the slot columns into a value record.
    pub fn value_record(&self) -> ItemValueRecord {
        ItemValueRecord {
            text: [self.text1.clone(), self.text2.clone(), self.text3.clone()],
            long_text: [
                self.long_text1.clone(),
                self.long_text2.clone(),
                self.long_text3.clone(),
            ],
            number: [self.number1, self.number2, self.number3],
            boolean: [self.bool1, self.bool2, self.bool3],
            link: [self.link1.clone(), self.link2.clone(), self.link3.clone()],
        }
    }
}

impl ActiveModel {
    /// Marks every slot column as set from `record`.
    pub fn set_value_record(&mut self, record: ItemValueRecord) {
        let [text1, text2, text3] = record.text;
        let [long_text1, long_text2, long_text3] = record.long_text;
        let [number1, number2, number3] = record.number;
        let [bool1, bool2, bool3] = record.boolean;
        let [link1, link2, link3] = record.link;

        self.text1 = Set(text1);
        self.text2 = Set(text2);
        self.text3 = Set(text3);
        self.long_text1 = Set(long_text1);
        self.long_text2 = Set(long_text2);
        self.long_text3 = Set(long_text3);
        self.number1 = Set(number1);
        self.number2 = Set(number2);
        self.number3 = Set(number3);
        self.bool1 = Set(bool1);
        self.bool2 = Set(bool2);
        self.bool3 = Set(bool3);
        self.link1 = Set(link1);
        self.link2 = Set(link2);
        self.link3 = Set(link3);
    }
}

/// Column backing `slot`.
pub fn slot_column(slot: SlotId) -> Result<Column, ServiceError> {
    let column = match (slot.family(), slot.index()) {
        (FieldType::Text, 1) => Column::Text1,
        (FieldType::Text, 2) => Column::Text2,
        (FieldType::Text, 3) => Column::Text3,
        (FieldType::LongText, 1) => Column::LongText1,
        (FieldType::LongText, 2) => Column::LongText2,
        (FieldType::LongText, 3) => Column::LongText3,
        (FieldType::Number, 1) => Column::Number1,
        (FieldType::Number, 2) => Column::Number2,
        (FieldType::Number, 3) => Column::Number3,
        (FieldType::Boolean, 1) => Column::Bool1,
        (FieldType::Boolean, 2) => Column::Bool2,
        (FieldType::Boolean, 3) => Column::Bool3,
        (FieldType::Link, 1) => Column::Link1,
        (FieldType::Link, 2) => Column::Link2,
        (FieldType::Link, 3) => Column::Link3,
        _ => return Err(ServiceError::InvalidSlot(slot.to_string())),
    };
    Ok(column)
}

/// Typed SQL NULL for a slot family's column.
pub fn null_value(family: FieldType) -> sea_orm::Value {
    match family {
        FieldType::Text | FieldType::LongText | FieldType::Link => sea_orm::Value::String(None),
        FieldType::Number => sea_orm::Value::Double(None),
        FieldType::Boolean => sea_orm::Value::Bool(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::SlotValue;
    use chrono::Utc;
    use sea_orm::IdenStatic;

    fn empty_row() -> Model {
        Model {
            id: Uuid::new_v4(),
            inventory_id: Uuid::new_v4(),
            custom_id: "ITEM-001".into(),
            created_by: Uuid::new_v4(),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            text1: None,
            text2: None,
            text3: None,
            long_text1: None,
            long_text2: None,
            long_text3: None,
            number1: None,
            number2: None,
            number3: None,
            bool1: None,
            bool2: None,
            bool3: None,
            link1: None,
            link2: None,
            link3: None,
        }
    }

    #[test]
    fn every_slot_has_a_column() {
        for slot in SlotId::all() {
            let column = slot_column(slot).unwrap();
            assert_eq!(column.as_str(), slot.to_string());
        }
    }

    #[test]
    fn record_reads_the_matching_columns() {
        let row = Model {
            text2: Some("blue".into()),
            number3: Some(7.5),
            bool1: Some(false),
            ..empty_row()
        };

        let record = row.value_record();

        assert_eq!(
            record.get_slot("text2".parse().unwrap()),
            SlotValue::Text("blue".into())
        );
        assert_eq!(
            record.get_slot("number3".parse().unwrap()),
            SlotValue::Number(7.5)
        );
        assert_eq!(
            record.get_slot("bool1".parse().unwrap()),
            SlotValue::Bool(false)
        );
        assert_eq!(record.filled_slots().count(), 3);
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{FieldType, SlotId};
use crate::entities::inventory_field;
use crate::errors::ServiceError;

/// A user-defined column of an inventory, bound to one physical slot.
///
/// The field type is derived from the slot, so a definition can never point
/// at a slot of a different family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub name: String,
    slot: SlotId,
    pub order_index: i32,
    pub required: bool,
    pub show_in_summary: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FieldDefinition {
    pub fn new(id: Uuid, inventory_id: Uuid, name: impl Into<String>, slot: SlotId) -> Self {
        Self {
            id,
            inventory_id,
            name: name.into(),
            slot,
            order_index: 0,
            required: false,
            show_in_summary: true,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn field_type(&self) -> FieldType {
        self.slot.family()
    }
}

impl TryFrom<inventory_field::Model> for FieldDefinition {
    type Error = ServiceError;

    fn try_from(model: inventory_field::Model) -> Result<Self, Self::Error> {
        let slot: SlotId = model.slot.parse()?;
        let field_type: FieldType = model.field_type.parse().map_err(|_| {
            ServiceError::InvalidSlot(format!(
                "field {} has unknown type '{}'",
                model.id, model.field_type
            ))
        })?;
        if slot.family() != field_type {
            return Err(ServiceError::InvalidSlot(format!(
                "field {} of type {} is stored in {}",
                model.id, field_type, slot
            )));
        }

        Ok(Self {
            id: model.id,
            inventory_id: model.inventory_id,
            name: model.name,
            slot,
            order_index: model.order_index,
            required: model.required,
            show_in_summary: model.show_in_summary,
            description: model.description,
            created_at: model.created_at,
        })
    }
}

/// Sorts by `order_index`, ties broken by id.
pub fn sort_fields(fields: &mut [FieldDefinition]) {
    fields.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn model(field_type: &str, slot: &str) -> inventory_field::Model {
        inventory_field::Model {
            id: Uuid::new_v4(),
            inventory_id: Uuid::new_v4(),
            name: "Weight".into(),
            field_type: field_type.into(),
            slot: slot.into(),
            order_index: 2,
            required: true,
            show_in_summary: false,
            description: Some("grams".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn converts_consistent_row() {
        let field = FieldDefinition::try_from(model("number", "number2")).unwrap();
        assert_eq!(field.field_type(), FieldType::Number);
        assert_eq!(field.slot().to_string(), "number2");
        assert!(field.required);
        assert!(!field.show_in_summary);
    }

    #[test]
    fn rejects_row_whose_slot_belongs_to_another_family() {
        assert_matches!(
            FieldDefinition::try_from(model("number", "text1")),
            Err(ServiceError::InvalidSlot(_))
        );
        assert_matches!(
            FieldDefinition::try_from(model("number", "number9")),
            Err(ServiceError::InvalidSlot(_))
        );
    }

    #[test]
    fn sort_breaks_ties_by_id() {
        let inventory = Uuid::new_v4();
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let mut fields = vec![
            FieldDefinition {
                order_index: 1,
                ..FieldDefinition::new(high, inventory, "b", "text2".parse().unwrap())
            },
            FieldDefinition {
                order_index: 1,
                ..FieldDefinition::new(low, inventory, "a", "text1".parse().unwrap())
            },
            FieldDefinition::new(Uuid::from_u128(3), inventory, "c", "bool1".parse().unwrap()),
        ];

        sort_fields(&mut fields);

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}

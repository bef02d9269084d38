//! Field-level reads and writes over an [`ItemValueRecord`].
//!
//! Callers address values by [`FieldDefinition`]; this layer resolves the
//! field's slot and coerces raw input to the slot family's native type.

use serde_json::{Map, Value};

use super::record::parse_number;
use super::{FieldDefinition, FieldType, ItemValueRecord, SlotId, SlotValue};
use crate::errors::ServiceError;

/// Reads the value of `field`; unset values read as null.
pub fn get_value(record: &ItemValueRecord, field: &FieldDefinition) -> SlotValue {
    record.get_slot(field.slot())
}

/// Coerces `raw` for `field` and writes it to the field's slot only.
pub fn set_value(
    record: &mut ItemValueRecord,
    field: &FieldDefinition,
    raw: &Value,
) -> Result<(), ServiceError> {
    let value = coerce(field, raw)?;
    record.set_slot(field.slot(), value)
}

/// Writes several values by field name. Either every value is written or,
/// on the first failure, none are.
pub fn set_values(
    record: &mut ItemValueRecord,
    fields: &[FieldDefinition],
    raw: &Map<String, Value>,
) -> Result<(), ServiceError> {
    let mut staged = record.clone();
    for (name, value) in raw {
        let field = fields
            .iter()
            .find(|f| &f.name == name)
            .ok_or_else(|| ServiceError::ValidationError(format!("unknown field '{}'", name)))?;
        set_value(&mut staged, field, value)?;
    }
    *record = staged;
    Ok(())
}

/// Nulls every filled slot that none of `fields` owns and returns how many
/// were cleared. Orphaned values must never reach a field that reuses the slot.
pub fn clear_orphans(record: &mut ItemValueRecord, fields: &[FieldDefinition]) -> usize {
    let orphans: Vec<SlotId> = record
        .filled_slots()
        .filter(|slot| !fields.iter().any(|f| f.slot() == *slot))
        .collect();
    for slot in &orphans {
        record.clear_slot(*slot);
    }
    orphans.len()
}

/// Converts raw input into the native value of `field`'s type.
pub fn coerce(field: &FieldDefinition, raw: &Value) -> Result<SlotValue, ServiceError> {
    let mismatch = || ServiceError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type(),
        found: raw.to_string(),
    };

    if raw.is_null() {
        return Ok(SlotValue::Null);
    }

    match field.field_type() {
        FieldType::Text | FieldType::LongText | FieldType::Link => match raw {
            Value::String(s) => Ok(SlotValue::Text(s.clone())),
            Value::Number(n) => Ok(SlotValue::Text(n.to_string())),
            Value::Bool(b) => Ok(SlotValue::Text(b.to_string())),
            _ => Err(mismatch()),
        },
        FieldType::Number => match raw {
            Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map(SlotValue::Number)
                .ok_or_else(mismatch),
            // an empty form input means "no value"
            Value::String(s) if s.trim().is_empty() => Ok(SlotValue::Null),
            Value::String(s) => parse_number(s).map(SlotValue::Number).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldType::Boolean => Ok(SlotValue::Bool(is_truthy(raw))),
    }
}

fn is_truthy(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

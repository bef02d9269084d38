use serde::{Deserialize, Serialize};
use std::fmt;

use super::{FieldType, SlotId, SLOTS_PER_FAMILY};
use crate::errors::ServiceError;

/// A value held by one slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SlotValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SlotValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SlotValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SlotValue::Null => "null",
            SlotValue::Bool(_) => "boolean",
            SlotValue::Number(_) => "number",
            SlotValue::Text(_) => "string",
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Null => f.write_str("null"),
            SlotValue::Bool(b) => write!(f, "{}", b),
            SlotValue::Number(n) => write!(f, "{}", n),
            SlotValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<Option<String>> for SlotValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SlotValue::Null, SlotValue::Text)
    }
}

impl From<Option<f64>> for SlotValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(SlotValue::Null, SlotValue::Number)
    }
}

impl From<Option<bool>> for SlotValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(SlotValue::Null, SlotValue::Bool)
    }
}

type Cells<T> = [Option<T>; SLOTS_PER_FAMILY];

/// The fixed-shape value container owned by one item: one nullable cell per
/// slot, grouped by family and addressed by [`SlotId`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemValueRecord {
    pub(crate) text: Cells<String>,
    pub(crate) long_text: Cells<String>,
    pub(crate) number: Cells<f64>,
    pub(crate) boolean: Cells<bool>,
    pub(crate) link: Cells<String>,
}

impl ItemValueRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one cell; unset cells read as [`SlotValue::Null`].
    pub fn get_slot(&self, slot: SlotId) -> SlotValue {
        let i = slot.offset();
        match slot.family() {
            FieldType::Text => self.text[i].clone().into(),
            FieldType::LongText => self.long_text[i].clone().into(),
            FieldType::Number => self.number[i].into(),
            FieldType::Boolean => self.boolean[i].into(),
            FieldType::Link => self.link[i].clone().into(),
        }
    }

    /// Writes one cell.
    ///
    /// A numeric string is accepted by a number slot; every other value whose
    /// native type differs from the slot family is rejected.
    pub fn set_slot(&mut self, slot: SlotId, value: SlotValue) -> Result<(), ServiceError> {
        let i = slot.offset();
        let family = slot.family();
        match family {
            FieldType::Text | FieldType::LongText | FieldType::Link => {
                let text = match value {
                    SlotValue::Null => None,
                    SlotValue::Text(s) => {
                        check_length(slot, &s)?;
                        Some(s)
                    }
                    other => return Err(mismatch(slot, &other)),
                };
                match family {
                    FieldType::Text => self.text[i] = text,
                    FieldType::LongText => self.long_text[i] = text,
                    _ => self.link[i] = text,
                }
            }
            FieldType::Number => {
                self.number[i] = match value {
                    SlotValue::Null => None,
                    SlotValue::Number(n) if n.is_finite() => Some(n),
                    SlotValue::Text(ref s) => match parse_number(s) {
                        Some(n) => Some(n),
                        None => return Err(mismatch(slot, &value)),
                    },
                    other => return Err(mismatch(slot, &other)),
                };
            }
            FieldType::Boolean => {
                self.boolean[i] = match value {
                    SlotValue::Null => None,
                    SlotValue::Bool(b) => Some(b),
                    other => return Err(mismatch(slot, &other)),
                };
            }
        }
        Ok(())
    }

    pub fn clear_slot(&mut self, slot: SlotId) {
        let i = slot.offset();
        match slot.family() {
            FieldType::Text => self.text[i] = None,
            FieldType::LongText => self.long_text[i] = None,
            FieldType::Number => self.number[i] = None,
            FieldType::Boolean => self.boolean[i] = None,
            FieldType::Link => self.link[i] = None,
        }
    }

    /// Slots currently holding a value.
    pub fn filled_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        SlotId::all().filter(move |slot| !self.get_slot(*slot).is_null())
    }
}

/// Parses a trimmed decimal string into a finite float.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn check_length(slot: SlotId, value: &str) -> Result<(), ServiceError> {
    match slot.family().max_len() {
        Some(max) if value.chars().count() > max => Err(ServiceError::ValidationError(format!(
            "value for {} exceeds {} characters",
            slot, max
        ))),
        _ => Ok(()),
    }
}

fn mismatch(slot: SlotId, value: &SlotValue) -> ServiceError {
    ServiceError::TypeMismatch {
        field: slot.to_string(),
        expected: slot.family(),
        found: value.kind().to_string(),
    }
}

//! Custom field slot model.
//!
//! Every inventory may define its own fields, but items store their values in
//! a fixed set of typed cells: `SLOTS_PER_FAMILY` per field type. A field is
//! bound to one cell (its [`SlotId`]) when it is created and keeps it until it
//! is deleted. Everything in this module is synchronous and free of I/O; the
//! services layer fetches the current state and persists the results.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

use crate::errors::ServiceError;

pub mod accessor;
pub mod allocator;
pub mod field;
pub mod record;

pub use allocator::allocate_slot;
pub use field::FieldDefinition;
pub use record::{ItemValueRecord, SlotValue};

/// Number of physical value cells per field type.
///
/// This fixes the column set of the `inventory_items` table; changing it
/// requires a migration and the matching entity columns.
pub const SLOTS_PER_FAMILY: usize = 3;

/// Maximum length of a short text value, in characters.
pub const TEXT_MAX_LEN: usize = 255;

/// Maximum length of a link value, in characters.
pub const LINK_MAX_LEN: usize = 1024;

/// Logical type of a custom field. Each type owns its own slot family.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    Text,
    LongText,
    Number,
    Boolean,
    Link,
}

impl FieldType {
    /// Name prefix of this type's slots (`text1`, `long_text2`, `bool3`, ...).
    pub const fn slot_prefix(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::LongText => "long_text",
            FieldType::Number => "number",
            FieldType::Boolean => "bool",
            FieldType::Link => "link",
        }
    }

    /// Character limit enforced on string values of this type.
    pub const fn max_len(self) -> Option<usize> {
        match self {
            FieldType::Text => Some(TEXT_MAX_LEN),
            FieldType::Link => Some(LINK_MAX_LEN),
            _ => None,
        }
    }

    fn from_slot_prefix(prefix: &str) -> Option<Self> {
        FieldType::iter().find(|ty| ty.slot_prefix() == prefix)
    }
}

/// A physical value cell: a slot family plus a 1-based index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    family: FieldType,
    index: u8,
}

impl SlotId {
    /// Builds a slot id, rejecting indexes outside `1..=SLOTS_PER_FAMILY`.
    pub fn new(family: FieldType, index: usize) -> Result<Self, ServiceError> {
        if index == 0 || index > SLOTS_PER_FAMILY {
            return Err(ServiceError::InvalidSlot(format!(
                "{}{}",
                family.slot_prefix(),
                index
            )));
        }
        Ok(Self {
            family,
            index: index as u8,
        })
    }

    pub fn family(&self) -> FieldType {
        self.family
    }

    /// 1-based position within the family.
    pub fn index(&self) -> usize {
        usize::from(self.index)
    }

    /// 0-based offset into the family's value array.
    pub(crate) fn offset(&self) -> usize {
        self.index() - 1
    }

    /// Every slot of one family in ascending index order.
    pub fn family_slots(family: FieldType) -> impl Iterator<Item = SlotId> {
        (1..=SLOTS_PER_FAMILY).map(move |index| SlotId {
            family,
            index: index as u8,
        })
    }

    /// The whole slot vocabulary.
    pub fn all() -> impl Iterator<Item = SlotId> {
        FieldType::iter().flat_map(SlotId::family_slots)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.family.slot_prefix(), self.index)
    }
}

impl FromStr for SlotId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ServiceError::InvalidSlot(s.to_string());
        let digits_at = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (prefix, digits) = s.split_at(digits_at);
        let family = FieldType::from_slot_prefix(prefix).ok_or_else(invalid)?;
        // only the canonical spelling, so a slot name round-trips exactly
        if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index: usize = digits.parse().map_err(|_| invalid())?;
        SlotId::new(family, index).map_err(|_| invalid())
    }
}

impl Serialize for SlotId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

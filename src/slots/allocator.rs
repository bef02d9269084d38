use std::collections::HashSet;

use super::{FieldType, SlotId};
use crate::errors::ServiceError;

/// Picks the lowest-numbered slot of `field_type` that is not in `used`.
///
/// `used` must hold the slots of every live field in the inventory; the
/// caller reads it from storage and relies on the `(inventory_id, slot)`
/// unique index to settle concurrent allocations.
pub fn allocate_slot(used: &HashSet<SlotId>, field_type: FieldType) -> Result<SlotId, ServiceError> {
    SlotId::family_slots(field_type)
        .find(|candidate| !used.contains(candidate))
        .ok_or(ServiceError::SlotsExhausted(field_type))
}

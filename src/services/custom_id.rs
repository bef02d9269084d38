//! Human-facing item identifiers.
//!
//! A template such as `ITEM-{Y}{m}-{000}` is expanded with the generation
//! date and a sequence number. The sequence is the inventory's item count
//! plus one, read at generation time; it is not stored anywhere, so two
//! concurrent creations can produce the same ID. The `(inventory_id,
//! custom_id)` unique index catches that and item creation retries with the
//! next sequence number.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::inventory_item;
use crate::errors::ServiceError;

/// Prefix of IDs generated for inventories without a template.
pub const FALLBACK_PREFIX: &str = "ITEM-";

/// Width of the `custom_id` column.
pub const MAX_CUSTOM_ID_LEN: usize = 255;

/// Expands the placeholders of `template`.
///
/// `{Y}` year, `{m}` month, `{d}` day, `{000}` and `{0000}` the zero-padded
/// sequence. Anything else is copied as is.
pub fn render(template: &str, sequence: u64, now: DateTime<Utc>) -> String {
    template
        .replace("{Y}", &format!("{:04}", now.year()))
        .replace("{m}", &format!("{:02}", now.month()))
        .replace("{d}", &format!("{:02}", now.day()))
        .replace("{0000}", &format!("{:04}", sequence))
        .replace("{000}", &format!("{:03}", sequence))
}

pub fn fallback_id() -> String {
    format!("{}{}", FALLBACK_PREFIX, Uuid::new_v4().simple())
}

/// Builds an ID from the inventory's template, or an opaque one if it has none.
///
/// Fails when the rendered ID does not fit the `custom_id` column.
pub fn generate(
    template: Option<&str>,
    sequence: u64,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let id = match template {
        Some(template) if !template.trim().is_empty() => render(template, sequence, now),
        _ => fallback_id(),
    };
    if id.chars().count() > MAX_CUSTOM_ID_LEN {
        return Err(ServiceError::ValidationError(format!(
            "generated custom ID is longer than {} characters; shorten the custom ID format",
            MAX_CUSTOM_ID_LEN
        )));
    }
    Ok(id)
}

/// Sequence number for the next item: existing item count plus one.
pub async fn next_sequence<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
) -> Result<u64, ServiceError> {
    let existing = inventory_item::Entity::find()
        .filter(inventory_item::Column::InventoryId.eq(inventory_id))
        .count(conn)
        .await?;
    Ok(existing + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rstest::rstest;

    fn march_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn fifth_item_in_march() {
        assert_eq!(render("ITEM-{Y}{m}-{000}", 5, march_15()), "ITEM-202403-005");
    }

    #[rstest]
    #[case("{Y}-{m}-{d}", 1, "2024-03-15")]
    #[case("INV{0000}", 42, "INV0042")]
    #[case("A{000}B{0000}", 7, "A007B0007")]
    #[case("{000}", 1234, "1234")]
    #[case("static", 9, "static")]
    #[case("{x}{000}", 3, "{x}003")]
    fn expands_placeholders(#[case] template: &str, #[case] sequence: u64, #[case] expected: &str) {
        assert_eq!(render(template, sequence, march_15()), expected);
    }

    #[test]
    fn missing_template_falls_back_to_opaque_id() {
        let first = generate(None, 1, march_15()).unwrap();
        let second = generate(Some("  "), 1, march_15()).unwrap();

        assert!(first.starts_with(FALLBACK_PREFIX));
        assert!(second.starts_with(FALLBACK_PREFIX));
        assert_ne!(first, second);
    }

    #[test]
    fn rendered_id_must_fit_the_column() {
        let widest = format!("{}{{Y}}", "X".repeat(MAX_CUSTOM_ID_LEN - 4));
        assert_eq!(
            generate(Some(&widest), 1, march_15()).unwrap().len(),
            MAX_CUSTOM_ID_LEN
        );

        let too_wide = "{0000}".repeat(20);
        assert_matches!(
            generate(Some(&too_wide), u64::MAX, march_15()),
            Err(ServiceError::ValidationError(msg)) if msg.contains("shorten")
        );
    }
}

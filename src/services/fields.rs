use crate::{
    db::DbPool,
    entities::{
        inventory_field,
        inventory_item::{self, null_value, slot_column},
    },
    errors::{unique_violation, ServiceError},
    services::inventories::{bump_inventory_version, find_inventory, lock_inventory},
    slots::{allocate_slot, field::sort_fields, FieldDefinition, FieldType, SlotId},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const MAX_FIELD_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewField {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_show_in_summary")]
    pub show_in_summary: bool,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Defaults to after the last existing field
    pub order_index: Option<i32>,
}

fn default_show_in_summary() -> bool {
    true
}

/// Metadata changes. Slot and type cannot change.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub required: Option<bool>,
    pub show_in_summary: Option<bool>,
    /// An empty string clears the description
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Field definitions of inventories and their slot assignments
#[derive(Clone)]
pub struct FieldService {
    db_pool: Arc<DbPool>,
}

impl FieldService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Adds a field bound to the lowest free slot of its type.
    #[instrument(skip(self, new_field), fields(field_type = %new_field.field_type))]
    pub async fn add_field(
        &self,
        inventory_id: Uuid,
        new_field: NewField,
        expected_version: Option<i32>,
    ) -> Result<FieldDefinition, ServiceError> {
        new_field.validate()?;
        let name = normalize_name(&new_field.name)?;

        let txn = self.db_pool.begin().await?;
        let inventory = lock_inventory(&txn, inventory_id, expected_version).await?;
        let existing = load_fields(&txn, inventory_id).await?;

        if existing.iter().any(|f| f.name == name) {
            return Err(ServiceError::DuplicateFieldName(name));
        }

        let used: HashSet<SlotId> = existing.iter().map(FieldDefinition::slot).collect();
        let slot = allocate_slot(&used, new_field.field_type).map_err(|e| {
            counter!("shelfmark.fields.slots_exhausted", 1);
            e
        })?;
        let order_index = new_field.order_index.unwrap_or_else(|| {
            existing
                .iter()
                .map(|f| f.order_index)
                .max()
                .map_or(0, |last| last + 1)
        });

        let model = inventory_field::ActiveModel {
            id: Set(Uuid::new_v4()),
            inventory_id: Set(inventory_id),
            name: Set(name.clone()),
            field_type: Set(new_field.field_type.to_string()),
            slot: Set(slot.to_string()),
            order_index: Set(order_index),
            required: Set(new_field.required),
            show_in_summary: Set(new_field.show_in_summary),
            description: Set(clean_description(new_field.description)),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| field_write_error(e, &name))?;

        bump_inventory_version(&txn, &inventory).await?;
        txn.commit().await?;

        counter!("shelfmark.fields.created", 1);
        info!(inventory_id = %inventory_id, field_id = %model.id, slot = %slot, "Field added");
        FieldDefinition::try_from(model)
    }

    /// Deletes a field and nulls its slot on every item of the inventory in
    /// the same transaction, so a later field reusing the slot starts empty.
    #[instrument(skip(self))]
    pub async fn remove_field(
        &self,
        field_id: Uuid,
        expected_version: Option<i32>,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let field = find_field(&txn, field_id).await?;
        let inventory = lock_inventory(&txn, field.inventory_id, expected_version).await?;

        let cleared = inventory_item::Entity::update_many()
            .col_expr(
                slot_column(field.slot())?,
                Expr::value(null_value(field.field_type())),
            )
            .filter(inventory_item::Column::InventoryId.eq(field.inventory_id))
            .exec(&txn)
            .await?;

        inventory_field::Entity::delete_by_id(field.id)
            .exec(&txn)
            .await?;

        bump_inventory_version(&txn, &inventory).await?;
        txn.commit().await?;

        counter!("shelfmark.fields.removed", 1);
        info!(
            inventory_id = %field.inventory_id,
            field_id = %field.id,
            slot = %field.slot(),
            items_cleared = cleared.rows_affected,
            "Field removed"
        );
        Ok(())
    }

    /// Rewrites every order index from the position in `ordered_ids`, which
    /// must hold each of the inventory's field ids exactly once.
    #[instrument(skip(self, ordered_ids))]
    pub async fn reorder_fields(
        &self,
        inventory_id: Uuid,
        ordered_ids: &[Uuid],
        expected_version: Option<i32>,
    ) -> Result<Vec<FieldDefinition>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let inventory = lock_inventory(&txn, inventory_id, expected_version).await?;
        let mut fields = load_fields(&txn, inventory_id).await?;

        check_complete_order(&fields, ordered_ids)?;

        for (position, field_id) in ordered_ids.iter().enumerate() {
            let position = position as i32;
            inventory_field::Entity::update_many()
                .col_expr(inventory_field::Column::OrderIndex, Expr::value(position))
                .filter(inventory_field::Column::Id.eq(*field_id))
                .exec(&txn)
                .await?;
            if let Some(field) = fields.iter_mut().find(|f| f.id == *field_id) {
                field.order_index = position;
            }
        }

        bump_inventory_version(&txn, &inventory).await?;
        txn.commit().await?;

        sort_fields(&mut fields);
        info!(inventory_id = %inventory_id, count = fields.len(), "Fields reordered");
        Ok(fields)
    }

    #[instrument(skip(self, update))]
    pub async fn update_field(
        &self,
        field_id: Uuid,
        update: FieldUpdate,
        expected_version: Option<i32>,
    ) -> Result<FieldDefinition, ServiceError> {
        update.validate()?;

        let txn = self.db_pool.begin().await?;
        let model = inventory_field::Entity::find_by_id(field_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Field {} not found", field_id)))?;
        let inventory = lock_inventory(&txn, model.inventory_id, expected_version).await?;

        let mut active: inventory_field::ActiveModel = model.clone().into();
        let mut name = model.name.clone();

        if let Some(raw) = update.name.as_deref() {
            let renamed = normalize_name(raw)?;
            if renamed != model.name {
                let taken = load_fields(&txn, model.inventory_id)
                    .await?
                    .iter()
                    .any(|f| f.id != field_id && f.name == renamed);
                if taken {
                    return Err(ServiceError::DuplicateFieldName(renamed));
                }
                active.name = Set(renamed.clone());
                name = renamed;
            }
        }
        if let Some(required) = update.required {
            active.required = Set(required);
        }
        if let Some(show) = update.show_in_summary {
            active.show_in_summary = Set(show);
        }
        if update.description.is_some() {
            active.description = Set(clean_description(update.description));
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| field_write_error(e, &name))?;

        bump_inventory_version(&txn, &inventory).await?;
        txn.commit().await?;

        info!(field_id = %field_id, "Field updated");
        FieldDefinition::try_from(updated)
    }

    /// Fields in display order.
    #[instrument(skip(self))]
    pub async fn list_fields(&self, inventory_id: Uuid) -> Result<Vec<FieldDefinition>, ServiceError> {
        find_inventory(&*self.db_pool, inventory_id).await?;
        load_fields(&*self.db_pool, inventory_id).await
    }

    #[instrument(skip(self))]
    pub async fn get_field(&self, field_id: Uuid) -> Result<FieldDefinition, ServiceError> {
        find_field(&*self.db_pool, field_id).await
    }
}

/// Reads an inventory's live fields, sorted for display.
pub(crate) async fn load_fields<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
) -> Result<Vec<FieldDefinition>, ServiceError> {
    let mut fields = inventory_field::Entity::find()
        .filter(inventory_field::Column::InventoryId.eq(inventory_id))
        .all(conn)
        .await?
        .into_iter()
        .map(FieldDefinition::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    sort_fields(&mut fields);
    Ok(fields)
}

async fn find_field<C: ConnectionTrait>(
    conn: &C,
    field_id: Uuid,
) -> Result<FieldDefinition, ServiceError> {
    inventory_field::Entity::find_by_id(field_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Field {} not found", field_id)))
        .and_then(FieldDefinition::try_from)
}

fn normalize_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_FIELD_NAME_LEN {
        return Err(ServiceError::ValidationError(format!(
            "field name must be 1 to {} characters",
            MAX_FIELD_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn check_complete_order(fields: &[FieldDefinition], ordered_ids: &[Uuid]) -> Result<(), ServiceError> {
    let current: HashSet<Uuid> = fields.iter().map(|f| f.id).collect();
    let requested: HashSet<Uuid> = ordered_ids.iter().copied().collect();

    if requested.len() != ordered_ids.len() {
        return Err(ServiceError::ValidationError(
            "field order contains duplicate ids".to_string(),
        ));
    }
    if requested != current {
        return Err(ServiceError::ValidationError(format!(
            "field order must list exactly the inventory's {} fields",
            current.len()
        )));
    }
    Ok(())
}

/// Maps unique-index violations raised by a field insert or update.
fn field_write_error(err: DbErr, name: &str) -> ServiceError {
    match unique_violation(&err) {
        Some(message) if message.contains("uniq_inventory_fields_name")
            || message.contains("inventory_fields.name") =>
        {
            ServiceError::DuplicateFieldName(name.to_string())
        }
        Some(message) if message.contains("uniq_inventory_fields_slot")
            || message.contains("inventory_fields.slot") =>
        {
            warn!(field = %name, "Slot taken by a concurrent field creation");
            counter!("shelfmark.fields.slot_conflicts", 1);
            ServiceError::Conflict("slot was assigned concurrently; retry the request".to_string())
        }
        Some(message) => ServiceError::Conflict(message),
        None => ServiceError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn field(id: u128, slot: &str) -> FieldDefinition {
        FieldDefinition::new(Uuid::from_u128(id), Uuid::nil(), format!("f{}", id), slot.parse().unwrap())
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(normalize_name("  Colour ").unwrap(), "Colour");
        assert_matches!(normalize_name("   "), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            normalize_name(&"n".repeat(101)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn order_must_name_every_field_once() {
        let fields = vec![field(1, "text1"), field(2, "number1"), field(3, "bool1")];
        let [a, b, c] = [1u128, 2, 3].map(Uuid::from_u128);

        assert!(check_complete_order(&fields, &[c, a, b]).is_ok());
        assert_matches!(
            check_complete_order(&fields, &[c, a]),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            check_complete_order(&fields, &[c, a, a]),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            check_complete_order(&fields, &[c, a, b, Uuid::from_u128(9)]),
            Err(ServiceError::ValidationError(_))
        );
    }

    async fn service_with_inventory() -> (FieldService, Uuid) {
        let pool = crate::db::establish_connection_with_config(&crate::db::DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let pool = Arc::new(pool);

        let inventory = crate::services::inventories::InventoryService::new(Arc::clone(&pool))
            .create_inventory(
                Uuid::new_v4(),
                crate::services::inventories::CreateInventoryRequest {
                    title: "Spares".into(),
                    description: None,
                    custom_id_format: None,
                    tags: Vec::new(),
                },
            )
            .await
            .unwrap();
        (FieldService::new(pool), inventory.id)
    }

    fn raw_field(inventory_id: Uuid, name: &str, slot: &str) -> inventory_field::ActiveModel {
        inventory_field::ActiveModel {
            id: Set(Uuid::new_v4()),
            inventory_id: Set(inventory_id),
            name: Set(name.to_string()),
            field_type: Set("text".to_string()),
            slot: Set(slot.to_string()),
            order_index: Set(9),
            required: Set(false),
            show_in_summary: Set(true),
            description: Set(None),
            created_at: Set(Utc::now()),
        }
    }

    #[tokio::test]
    async fn two_fields_cannot_share_a_slot() {
        let (service, inventory_id) = service_with_inventory().await;
        let colour = service
            .add_field(
                inventory_id,
                NewField {
                    name: "Colour".into(),
                    field_type: FieldType::Text,
                    required: false,
                    show_in_summary: true,
                    description: None,
                    order_index: None,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(colour.slot().to_string(), "text1");

        // a writer that skipped the allocator, as a racing request would
        let err = raw_field(inventory_id, "Finish", "text1")
            .insert(&*service.db_pool)
            .await
            .unwrap_err();
        assert_matches!(field_write_error(err, "Finish"), ServiceError::Conflict(_));

        let err = raw_field(inventory_id, "Colour", "text2")
            .insert(&*service.db_pool)
            .await
            .unwrap_err();
        assert_matches!(
            field_write_error(err, "Colour"),
            ServiceError::DuplicateFieldName(name) if name == "Colour"
        );

        let fields = service.list_fields(inventory_id).await.unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn other_write_errors_stay_database_errors() {
        let err = DbErr::Custom("disk I/O error".into());
        assert_matches!(
            field_write_error(err, "Colour"),
            ServiceError::DatabaseError(_)
        );
    }
}

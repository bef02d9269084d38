use crate::{
    db::DbPool,
    entities::{inventory_item, item_like},
    errors::{unique_violation, ServiceError},
    services::{
        custom_id,
        fields::load_fields,
        inventories::{confirm_inventory_version, find_inventory, lock_inventory},
    },
    slots::{accessor, FieldDefinition, FieldType, ItemValueRecord, SlotValue},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_CUSTOM_ID_ATTEMPTS: u32 = 5;

/// One field's value on an item
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldValue {
    pub field_id: Uuid,
    pub name: String,
    pub field_type: FieldType,
    #[schema(value_type = Object)]
    pub value: SlotValue,
}

/// An item with its values resolved through the inventory's live fields
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemView {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub custom_id: String,
    pub created_by: Uuid,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub values: Vec<FieldValue>,
    pub like_count: u64,
}

impl ItemView {
    fn build(item: inventory_item::Model, fields: &[FieldDefinition], like_count: u64) -> Self {
        let record = item.value_record();
        let values = fields
            .iter()
            .map(|field| FieldValue {
                field_id: field.id,
                name: field.name.clone(),
                field_type: field.field_type(),
                value: accessor::get_value(&record, field),
            })
            .collect();

        Self {
            id: item.id,
            inventory_id: item.inventory_id,
            custom_id: item.custom_id,
            created_by: item.created_by,
            version: item.version,
            created_at: item.created_at,
            updated_at: item.updated_at,
            values,
            like_count,
        }
    }

    /// Value of the field called `name`, if the inventory has one.
    pub fn value(&self, name: &str) -> Option<&SlotValue> {
        self.values.iter().find(|v| v.name == name).map(|v| &v.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: u64,
}

enum CreateAttempt {
    Created(ItemView),
    /// The generated custom ID already exists in the inventory.
    Taken(String),
}

/// Items and their slot values
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
    custom_id_max_attempts: u32,
}

impl ItemService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            custom_id_max_attempts: DEFAULT_CUSTOM_ID_ATTEMPTS,
        }
    }

    pub fn with_custom_id_attempts(mut self, attempts: u32) -> Self {
        self.custom_id_max_attempts = attempts.max(1);
        self
    }

    /// Creates an item with a generated custom ID and its initial values.
    ///
    /// A custom ID collision is retried with the next sequence number, and so
    /// is a concurrent change to the inventory's fields.
    #[instrument(skip(self, values))]
    pub async fn create_item(
        &self,
        inventory_id: Uuid,
        created_by: Uuid,
        values: &Map<String, Value>,
    ) -> Result<ItemView, ServiceError> {
        let mut last_taken: Option<String> = None;
        for attempt in 0..self.custom_id_max_attempts {
            let outcome = self
                .try_create_item(inventory_id, created_by, values, attempt)
                .await;
            match outcome {
                Ok(CreateAttempt::Created(item)) => {
                    counter!("shelfmark.items.created", 1);
                    info!(item_id = %item.id, custom_id = %item.custom_id, "Item created");
                    return Ok(item);
                }
                Ok(CreateAttempt::Taken(custom_id)) => {
                    counter!("shelfmark.items.custom_id_collisions", 1);
                    if last_taken.as_deref() == Some(custom_id.as_str()) {
                        return Err(ServiceError::Conflict(format!(
                            "custom ID '{}' is already taken and the custom ID format has no \
                             {{000}} or {{0000}} sequence placeholder to make it unique",
                            custom_id
                        )));
                    }
                    warn!(
                        inventory_id = %inventory_id,
                        attempt,
                        %custom_id,
                        "Custom ID taken, retrying"
                    );
                    last_taken = Some(custom_id);
                }
                Err(err) if err.is_retryable() && attempt + 1 < self.custom_id_max_attempts => {
                    warn!(
                        inventory_id = %inventory_id,
                        attempt,
                        error = %err,
                        "Item creation raced with a field change, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(ServiceError::Conflict(format!(
            "could not generate a unique custom ID after {} attempts",
            self.custom_id_max_attempts
        )))
    }

    /// One creation attempt inside its own transaction.
    async fn try_create_item(
        &self,
        inventory_id: Uuid,
        created_by: Uuid,
        values: &Map<String, Value>,
        attempt: u32,
    ) -> Result<CreateAttempt, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let inventory = lock_inventory(&txn, inventory_id, None).await?;
        let fields = load_fields(&txn, inventory_id).await?;

        let mut record = ItemValueRecord::new();
        accessor::set_values(&mut record, &fields, values)?;
        check_required(&record, fields.iter())?;

        let sequence = custom_id::next_sequence(&txn, inventory_id).await? + u64::from(attempt);
        let now = Utc::now();
        let custom_id = custom_id::generate(inventory.custom_id_format.as_deref(), sequence, now)?;

        let mut active = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            inventory_id: Set(inventory_id),
            custom_id: Set(custom_id.clone()),
            created_by: Set(created_by),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.set_value_record(record);

        let item = match active.insert(&txn).await {
            Ok(item) => item,
            Err(err) if is_custom_id_collision(&err) => {
                return Ok(CreateAttempt::Taken(custom_id))
            }
            Err(err) => return Err(err.into()),
        };

        confirm_inventory_version(&txn, &inventory).await?;
        txn.commit().await?;

        Ok(CreateAttempt::Created(ItemView::build(item, &fields, 0)))
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<ItemView, ServiceError> {
        let db = &*self.db_pool;
        let item = inventory_item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| item_not_found(item_id))?;
        let fields = load_fields(db, item.inventory_id).await?;
        let likes = item_like::Entity::find()
            .filter(item_like::Column::ItemId.eq(item_id))
            .count(db)
            .await?;
        Ok(ItemView::build(item, &fields, likes))
    }

    /// Items of an inventory, oldest first.
    #[instrument(skip(self))]
    pub async fn list_items(&self, inventory_id: Uuid) -> Result<Vec<ItemView>, ServiceError> {
        let db = &*self.db_pool;
        find_inventory(db, inventory_id).await?;
        let fields = load_fields(db, inventory_id).await?;

        let items = inventory_item::Entity::find()
            .filter(inventory_item::Column::InventoryId.eq(inventory_id))
            .order_by_asc(inventory_item::Column::CreatedAt)
            .order_by_asc(inventory_item::Column::Id)
            .all(db)
            .await?;

        let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let mut likes: HashMap<Uuid, u64> = HashMap::new();
        if !item_ids.is_empty() {
            for like in item_like::Entity::find()
                .filter(item_like::Column::ItemId.is_in(item_ids))
                .all(db)
                .await?
            {
                *likes.entry(like.item_id).or_default() += 1;
            }
        }

        Ok(items
            .into_iter()
            .map(|item| {
                let count = likes.get(&item.id).copied().unwrap_or(0);
                ItemView::build(item, &fields, count)
            })
            .collect())
    }

    /// Writes values by field name. Every value is coerced before anything is
    /// stored; one bad value rejects the whole update.
    #[instrument(skip(self, values))]
    pub async fn update_values(
        &self,
        item_id: Uuid,
        values: &Map<String, Value>,
        expected_version: Option<i32>,
    ) -> Result<ItemView, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let item = inventory_item::Entity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| item_not_found(item_id))?;
        if expected_version.is_some_and(|v| v != item.version) {
            return Err(ServiceError::ConcurrentModification(item_id));
        }

        let inventory = lock_inventory(&txn, item.inventory_id, None).await?;
        let fields = load_fields(&txn, item.inventory_id).await?;

        let mut record = item.value_record();
        let orphans = accessor::clear_orphans(&mut record, &fields);
        if orphans > 0 {
            warn!(item_id = %item_id, orphans, "Cleared values left in unassigned slots");
        }
        accessor::set_values(&mut record, &fields, values)?;
        check_required(
            &record,
            fields.iter().filter(|f| values.contains_key(&f.name)),
        )?;

        let mut active = inventory_item::ActiveModel {
            version: Set(item.version + 1),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        active.set_value_record(record);

        let result = inventory_item::Entity::update_many()
            .set(active)
            .filter(inventory_item::Column::Id.eq(item_id))
            .filter(inventory_item::Column::Version.eq(item.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            counter!("shelfmark.items.version_conflicts", 1);
            return Err(ServiceError::ConcurrentModification(item_id));
        }

        confirm_inventory_version(&txn, &inventory).await?;
        let view = self.load_view(&txn, item_id, &fields).await?;
        txn.commit().await?;

        counter!("shelfmark.items.updated", 1);
        debug!(item_id = %item_id, version = view.version, "Item values updated");
        Ok(view)
    }

    /// Deletes the item together with its likes.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        inventory_item::Entity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| item_not_found(item_id))?;

        item_like::Entity::delete_many()
            .filter(item_like::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await?;
        inventory_item::Entity::delete_by_id(item_id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        counter!("shelfmark.items.deleted", 1);
        info!(item_id = %item_id, "Item deleted");
        Ok(())
    }

    /// Likes the item for `user_id`, or removes the like if there is one.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, item_id: Uuid, user_id: Uuid) -> Result<LikeStatus, ServiceError> {
        let txn = self.db_pool.begin().await?;
        inventory_item::Entity::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| item_not_found(item_id))?;

        let existing = item_like::Entity::find()
            .filter(item_like::Column::ItemId.eq(item_id))
            .filter(item_like::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        let liked = match existing {
            Some(like) => {
                item_like::Entity::delete_by_id(like.id).exec(&txn).await?;
                false
            }
            None => {
                item_like::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    item_id: Set(item_id),
                    user_id: Set(user_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?;
                true
            }
        };

        let like_count = item_like::Entity::find()
            .filter(item_like::Column::ItemId.eq(item_id))
            .count(&txn)
            .await?;
        txn.commit().await?;

        Ok(LikeStatus { liked, like_count })
    }

    async fn load_view(
        &self,
        txn: &DatabaseTransaction,
        item_id: Uuid,
        fields: &[FieldDefinition],
    ) -> Result<ItemView, ServiceError> {
        let item = inventory_item::Entity::find_by_id(item_id)
            .one(txn)
            .await?
            .ok_or_else(|| item_not_found(item_id))?;
        let likes = item_like::Entity::find()
            .filter(item_like::Column::ItemId.eq(item_id))
            .count(txn)
            .await?;
        Ok(ItemView::build(item, fields, likes))
    }
}

fn item_not_found(item_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Item {} not found", item_id))
}

/// Rejects a record where any of `to_check` is required but empty.
fn check_required<'a>(
    record: &ItemValueRecord,
    to_check: impl Iterator<Item = &'a FieldDefinition>,
) -> Result<(), ServiceError> {
    for field in to_check.filter(|f| f.required) {
        if accessor::get_value(record, field).is_null() {
            return Err(ServiceError::ValidationError(format!(
                "field '{}' is required",
                field.name
            )));
        }
    }
    Ok(())
}

fn is_custom_id_collision(err: &DbErr) -> bool {
    unique_violation(err).is_some_and(|message| {
        message.contains("uniq_inventory_items_custom_id")
            || message.contains("inventory_items.custom_id")
    })
}

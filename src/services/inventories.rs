use crate::{
    db::DbPool,
    entities::{
        inventory, inventory_access, inventory_field, inventory_has_tag, inventory_item,
        inventory_tag, item_like,
    },
    errors::{unique_violation, ServiceError},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const MAX_TAG_LEN: usize = 100;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Template for generated item IDs, e.g. `ITEM-{Y}{m}-{000}`
    #[validate(length(min = 1, max = 100))]
    pub custom_id_format: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
}

/// Partial edit of an inventory's descriptive attributes
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    /// An empty string clears the description
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Replaces the whole tag set
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
}

/// Service owning inventory rows and their optimistic version counter
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request))]
    pub async fn create_inventory(
        &self,
        owner_id: Uuid,
        request: CreateInventoryRequest,
    ) -> Result<inventory::Model, ServiceError> {
        request.validate()?;
        let title = normalize_title(&request.title)?;
        let tags = normalize_tags(&request.tags)?;

        let now = Utc::now();
        let txn = self.db_pool.begin().await?;
        let model = inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title),
            description: Set(clean_text(request.description)),
            owner_id: Set(owner_id),
            custom_id_format: Set(request.custom_id_format),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        attach_tags(&txn, model.id, &tags).await?;
        txn.commit().await?;

        counter!("shelfmark.inventories.created", 1);
        info!(inventory_id = %model.id, "Inventory created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get_inventory(&self, inventory_id: Uuid) -> Result<inventory::Model, ServiceError> {
        find_inventory(&*self.db_pool, inventory_id).await
    }

    /// Inventories `user_id` owns or holds a grant on, newest first.
    #[instrument(skip(self))]
    pub async fn list_inventories(&self, user_id: Uuid) -> Result<Vec<inventory::Model>, ServiceError> {
        let db = &*self.db_pool;
        let granted: Vec<Uuid> = inventory_access::Entity::find()
            .filter(inventory_access::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|grant| grant.inventory_id)
            .collect();

        let mut visible = Condition::any().add(inventory::Column::OwnerId.eq(user_id));
        if !granted.is_empty() {
            visible = visible.add(inventory::Column::Id.is_in(granted));
        }

        let inventories = inventory::Entity::find()
            .filter(visible)
            .order_by_desc(inventory::Column::CreatedAt)
            .order_by_asc(inventory::Column::Id)
            .all(db)
            .await?;
        Ok(inventories)
    }

    /// Edits title, description and tags under the inventory's version guard.
    #[instrument(skip(self, request))]
    pub async fn update_inventory(
        &self,
        inventory_id: Uuid,
        request: UpdateInventoryRequest,
        expected_version: Option<i32>,
    ) -> Result<inventory::Model, ServiceError> {
        request.validate()?;
        let title = request.title.as_deref().map(normalize_title).transpose()?;
        let tags = request.tags.as_deref().map(normalize_tags).transpose()?;

        let txn = self.db_pool.begin().await?;
        let current = lock_inventory(&txn, inventory_id, expected_version).await?;
        let version = bump_inventory_version(&txn, &current).await?;

        let mut active: inventory::ActiveModel = current.into();
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(description) = request.description {
            active.description = Set(clean_text(Some(description)));
        }
        active.version = Set(version);
        let updated = active.update(&txn).await?;

        if let Some(tags) = tags {
            inventory_has_tag::Entity::delete_many()
                .filter(inventory_has_tag::Column::InventoryId.eq(inventory_id))
                .exec(&txn)
                .await?;
            attach_tags(&txn, inventory_id, &tags).await?;
        }
        txn.commit().await?;

        info!(inventory_id = %inventory_id, version, "Inventory updated");
        Ok(updated)
    }

    /// Deletes the inventory with its fields, items, likes, grants and tag links.
    #[instrument(skip(self))]
    pub async fn delete_inventory(
        &self,
        inventory_id: Uuid,
        expected_version: Option<i32>,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = lock_inventory(&txn, inventory_id, expected_version).await?;

        let item_ids: Vec<Uuid> = inventory_item::Entity::find()
            .filter(inventory_item::Column::InventoryId.eq(inventory_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();
        if !item_ids.is_empty() {
            item_like::Entity::delete_many()
                .filter(item_like::Column::ItemId.is_in(item_ids.clone()))
                .exec(&txn)
                .await?;
        }
        inventory_item::Entity::delete_many()
            .filter(inventory_item::Column::InventoryId.eq(inventory_id))
            .exec(&txn)
            .await?;
        inventory_field::Entity::delete_many()
            .filter(inventory_field::Column::InventoryId.eq(inventory_id))
            .exec(&txn)
            .await?;
        inventory_access::Entity::delete_many()
            .filter(inventory_access::Column::InventoryId.eq(inventory_id))
            .exec(&txn)
            .await?;
        inventory_has_tag::Entity::delete_many()
            .filter(inventory_has_tag::Column::InventoryId.eq(inventory_id))
            .exec(&txn)
            .await?;

        let result = inventory::Entity::delete_many()
            .filter(inventory::Column::Id.eq(inventory_id))
            .filter(inventory::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            counter!("shelfmark.inventories.version_conflicts", 1);
            return Err(ServiceError::ConcurrentModification(inventory_id));
        }
        txn.commit().await?;

        counter!("shelfmark.inventories.deleted", 1);
        info!(inventory_id = %inventory_id, items = item_ids.len(), "Inventory deleted");
        Ok(())
    }

    /// Sets or clears the item ID template. Existing items keep their IDs.
    #[instrument(skip(self))]
    pub async fn set_custom_id_format(
        &self,
        inventory_id: Uuid,
        format: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<inventory::Model, ServiceError> {
        let format = format
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        if format.as_ref().is_some_and(|f| f.chars().count() > 100) {
            return Err(ServiceError::ValidationError(
                "custom_id_format must be at most 100 characters".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        let current = lock_inventory(&txn, inventory_id, expected_version).await?;
        let version = bump_inventory_version(&txn, &current).await?;

        let mut active: inventory::ActiveModel = current.into();
        active.custom_id_format = Set(format);
        active.version = Set(version);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(inventory_id = %inventory_id, version, "Custom ID format updated");
        Ok(updated)
    }

    /// Tag names of one inventory, sorted.
    pub async fn list_tags(&self, inventory_id: Uuid) -> Result<Vec<String>, ServiceError> {
        let mut tags = self.tags_for(&[inventory_id]).await?;
        Ok(tags.remove(&inventory_id).unwrap_or_default())
    }

    /// Tag names keyed by inventory, each list sorted.
    pub async fn tags_for(
        &self,
        inventory_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, ServiceError> {
        let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
        if inventory_ids.is_empty() {
            return Ok(tags);
        }

        let links = inventory_has_tag::Entity::find()
            .filter(inventory_has_tag::Column::InventoryId.is_in(inventory_ids.to_vec()))
            .find_also_related(inventory_tag::Entity)
            .all(&*self.db_pool)
            .await?;
        for (link, tag) in links {
            if let Some(tag) = tag {
                tags.entry(link.inventory_id).or_default().push(tag.name);
            }
        }
        for names in tags.values_mut() {
            names.sort();
        }
        Ok(tags)
    }
}

fn normalize_title(raw: &str) -> Result<String, ServiceError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ServiceError::ValidationError(
            "title must not be blank".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn clean_text(raw: Option<String>) -> Option<String> {
    raw.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Trims tag names and drops blanks and repeats, keeping first-seen order.
fn normalize_tags(raw: &[String]) -> Result<Vec<String>, ServiceError> {
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if name.chars().count() > MAX_TAG_LEN {
            return Err(ServiceError::ValidationError(format!(
                "tag '{}' is longer than {} characters",
                name, MAX_TAG_LEN
            )));
        }
        if !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    }
    Ok(tags)
}

/// Links `names` to the inventory, creating tags that do not exist yet.
async fn attach_tags<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
    names: &[String],
) -> Result<(), ServiceError> {
    for name in names {
        let tag = find_or_create_tag(conn, name).await?;
        inventory_has_tag::ActiveModel {
            inventory_id: Set(inventory_id),
            tag_id: Set(tag.id),
        }
        .insert(conn)
        .await?;
    }
    if !names.is_empty() {
        debug!(inventory_id = %inventory_id, count = names.len(), "Tags attached");
    }
    Ok(())
}

async fn find_or_create_tag<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<inventory_tag::Model, ServiceError> {
    let existing = inventory_tag::Entity::find()
        .filter(inventory_tag::Column::Name.eq(name))
        .one(conn)
        .await?;
    if let Some(tag) = existing {
        return Ok(tag);
    }

    let created = inventory_tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await;

    match created {
        Ok(tag) => Ok(tag),
        Err(err) if unique_violation(&err).is_some() => Err(ServiceError::Conflict(format!(
            "tag '{}' was created concurrently; retry the request",
            name
        ))),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn find_inventory<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
) -> Result<inventory::Model, ServiceError> {
    inventory::Entity::find_by_id(inventory_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Inventory {} not found", inventory_id)))
}

/// Loads the inventory and checks the caller's view of its version.
pub(crate) async fn lock_inventory<C: ConnectionTrait>(
    conn: &C,
    inventory_id: Uuid,
    expected_version: Option<i32>,
) -> Result<inventory::Model, ServiceError> {
    let current = find_inventory(conn, inventory_id).await?;
    if let Some(expected) = expected_version {
        if expected != current.version {
            warn!(
                inventory_id = %inventory_id,
                expected,
                actual = current.version,
                "Stale inventory version"
            );
            counter!("shelfmark.inventories.version_conflicts", 1);
            return Err(ServiceError::ConcurrentModification(inventory_id));
        }
    }
    Ok(current)
}

/// Increments the version, failing if someone else did since `current` was read.
pub(crate) async fn bump_inventory_version<C: ConnectionTrait>(
    conn: &C,
    current: &inventory::Model,
) -> Result<i32, ServiceError> {
    let next = current.version + 1;
    let result = inventory::Entity::update_many()
        .col_expr(inventory::Column::Version, Expr::value(next))
        .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory::Column::Id.eq(current.id))
        .filter(inventory::Column::Version.eq(current.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        counter!("shelfmark.inventories.version_conflicts", 1);
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    Ok(next)
}

/// Takes the inventory row lock without changing the version, so item writes
/// serialize behind field deletion.
pub(crate) async fn confirm_inventory_version<C: ConnectionTrait>(
    conn: &C,
    current: &inventory::Model,
) -> Result<(), ServiceError> {
    let result = inventory::Entity::update_many()
        .col_expr(inventory::Column::Version, Expr::value(current.version))
        .filter(inventory::Column::Id.eq(current.id))
        .filter(inventory::Column::Version.eq(current.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        counter!("shelfmark.inventories.version_conflicts", 1);
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    Ok(())
}

use crate::{
    db::DbPool,
    entities::inventory_access,
    errors::ServiceError,
    services::inventories::find_inventory,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Write-access checks for inventories.
///
/// The owner may always write; anyone else needs a grant with `can_write`.
#[derive(Clone)]
pub struct AccessService {
    db_pool: Arc<DbPool>,
}

impl AccessService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates or replaces the grant for `user_id`.
    #[instrument(skip(self))]
    pub async fn grant_access(
        &self,
        inventory_id: Uuid,
        user_id: Uuid,
        can_write: bool,
    ) -> Result<inventory_access::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let inventory = find_inventory(&txn, inventory_id).await?;
        if inventory.owner_id == user_id {
            return Err(ServiceError::ValidationError(
                "the owner already has full access".to_string(),
            ));
        }

        let existing = inventory_access::Entity::find()
            .filter(inventory_access::Column::InventoryId.eq(inventory_id))
            .filter(inventory_access::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        let grant = match existing {
            Some(row) => {
                let mut active: inventory_access::ActiveModel = row.into();
                active.can_write = Set(can_write);
                active.update(&txn).await?
            }
            None => {
                inventory_access::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    inventory_id: Set(inventory_id),
                    user_id: Set(user_id),
                    can_write: Set(can_write),
                    created_at: Set(Utc::now()),
                }
                .insert(&txn)
                .await?
            }
        };
        txn.commit().await?;

        info!(inventory_id = %inventory_id, user_id = %user_id, can_write, "Access granted");
        Ok(grant)
    }

    /// Removes the grant; returns whether one existed.
    #[instrument(skip(self))]
    pub async fn revoke_access(&self, inventory_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        let result = inventory_access::Entity::delete_many()
            .filter(inventory_access::Column::InventoryId.eq(inventory_id))
            .filter(inventory_access::Column::UserId.eq(user_id))
            .exec(&*self.db_pool)
            .await?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    pub async fn list_access(
        &self,
        inventory_id: Uuid,
    ) -> Result<Vec<inventory_access::Model>, ServiceError> {
        find_inventory(&*self.db_pool, inventory_id).await?;
        let grants = inventory_access::Entity::find()
            .filter(inventory_access::Column::InventoryId.eq(inventory_id))
            .order_by_asc(inventory_access::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(grants)
    }

    pub async fn user_can_write(&self, inventory_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        let inventory = find_inventory(&*self.db_pool, inventory_id).await?;
        if inventory.owner_id == user_id {
            return Ok(true);
        }

        let grant = inventory_access::Entity::find()
            .filter(inventory_access::Column::InventoryId.eq(inventory_id))
            .filter(inventory_access::Column::UserId.eq(user_id))
            .one(&*self.db_pool)
            .await?;
        Ok(grant.is_some_and(|g| g.can_write))
    }

    pub async fn ensure_can_write(&self, inventory_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        if self.user_can_write(inventory_id, user_id).await? {
            Ok(())
        } else {
            debug!(inventory_id = %inventory_id, user_id = %user_id, "Write access denied");
            Err(ServiceError::Forbidden(format!(
                "No write access to inventory {}",
                inventory_id
            )))
        }
    }

    /// Only the owner manages grants and inventory settings.
    pub async fn ensure_owner(&self, inventory_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        let inventory = find_inventory(&*self.db_pool, inventory_id).await?;
        if inventory.owner_id == user_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Only the owner can manage inventory {}",
                inventory_id
            )))
        }
    }
}

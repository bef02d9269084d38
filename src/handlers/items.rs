use crate::{
    errors::ServiceError,
    handlers::Actor,
    services::items::{ItemView, LikeStatus},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ItemValuesRequest {
    /// Values keyed by field name
    #[serde(default)]
    #[schema(value_type = Object)]
    pub values: Map<String, Value>,
    /// Only honoured on update; compared with the item's version
    pub expected_version: Option<i32>,
}

/// Loads the item and fails with NotFound unless it belongs to `inventory_id`.
async fn item_in_inventory(
    state: &AppState,
    inventory_id: Uuid,
    item_id: Uuid,
) -> Result<ItemView, ServiceError> {
    let item = state.items.get_item(item_id).await?;
    if item.inventory_id != inventory_id {
        return Err(ServiceError::NotFound(format!("Item {} not found", item_id)));
    }
    Ok(item)
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/{inventory_id}/items",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    responses(
        (status = 200, description = "Items, oldest first", body = ApiResponse<Vec<ItemView>>),
        (status = 404, description = "Inventory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> ApiResult<Vec<ItemView>> {
    let items = state.items.list_items(inventory_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventories/{inventory_id}/items",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    request_body = ItemValuesRequest,
    responses(
        (status = 200, description = "Item created", body = ApiResponse<ItemView>),
        (status = 400, description = "Unknown field or missing required value", body = crate::errors::ErrorResponse),
        (status = 403, description = "No write access", body = crate::errors::ErrorResponse),
        (status = 409, description = "Custom ID could not be made unique", body = crate::errors::ErrorResponse),
        (status = 422, description = "Value does not fit the field type", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
    Json(payload): Json<ItemValuesRequest>,
) -> ApiResult<ItemView> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    let item = state
        .items
        .create_item(inventory_id, user_id, &payload.values)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/{inventory_id}/items/{item_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item fetched", body = ApiResponse<ItemView>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path((inventory_id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ItemView> {
    let item = item_in_inventory(&state, inventory_id, item_id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventories/{inventory_id}/items/{item_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    request_body = ItemValuesRequest,
    responses(
        (status = 200, description = "Values written", body = ApiResponse<ItemView>),
        (status = 409, description = "Item or inventory changed concurrently", body = crate::errors::ErrorResponse),
        (status = 422, description = "Value does not fit the field type", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path((inventory_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ItemValuesRequest>,
) -> ApiResult<ItemView> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    item_in_inventory(&state, inventory_id, item_id).await?;
    let item = state
        .items
        .update_values(item_id, &payload.values, payload.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventories/{inventory_id}/items/{item_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path((inventory_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    item_in_inventory(&state, inventory_id, item_id).await?;
    state.items.delete_item(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/inventories/{inventory_id}/items/{item_id}/like",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("item_id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Like toggled", body = ApiResponse<LikeStatus>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn toggle_like(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path((inventory_id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<LikeStatus> {
    item_in_inventory(&state, inventory_id, item_id).await?;
    let status = state.items.toggle_like(item_id, user_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

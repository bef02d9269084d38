use crate::{
    entities::{inventory, inventory_access},
    errors::ServiceError,
    handlers::{fields::VersionQuery, Actor},
    services::inventories::{CreateInventoryRequest, UpdateInventoryRequest},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    /// Template for generated item IDs
    #[schema(example = "ITEM-{Y}{m}-{000}")]
    pub custom_id_format: Option<String>,
    pub tags: Vec<String>,
    /// Optimistic lock counter; send it back as `expected_version`
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryResponse {
    fn new(model: inventory::Model, tags: Vec<String>) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            owner_id: model.owner_id,
            custom_id_format: model.custom_id_format,
            tags,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

async fn inventory_response(
    state: &AppState,
    model: inventory::Model,
) -> ApiResult<InventoryResponse> {
    let tags = state.inventories.list_tags(model.id).await?;
    Ok(Json(ApiResponse::success(InventoryResponse::new(model, tags))))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInventoryBody {
    #[serde(flatten)]
    pub changes: UpdateInventoryRequest,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomIdFormatRequest {
    /// `null` switches back to opaque generated IDs
    pub format: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessResponse {
    pub user_id: Uuid,
    pub can_write: bool,
    pub created_at: DateTime<Utc>,
}

impl From<inventory_access::Model> for AccessResponse {
    fn from(model: inventory_access::Model) -> Self {
        Self {
            user_id: model.user_id,
            can_write: model.can_write,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantAccessRequest {
    #[serde(default)]
    pub can_write: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/inventories",
    request_body = CreateInventoryRequest,
    responses(
        (status = 200, description = "Inventory created", body = ApiResponse<InventoryResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing user", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Json(payload): Json<CreateInventoryRequest>,
) -> ApiResult<InventoryResponse> {
    let created = state.inventories.create_inventory(user_id, payload).await?;
    inventory_response(&state, created).await
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories",
    responses(
        (status = 200, description = "Inventories the caller owns or may access", body = ApiResponse<Vec<InventoryResponse>>),
        (status = 401, description = "Missing user", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn list_inventories(
    State(state): State<AppState>,
    Actor(user_id): Actor,
) -> ApiResult<Vec<InventoryResponse>> {
    let inventories = state.inventories.list_inventories(user_id).await?;
    let ids: Vec<Uuid> = inventories.iter().map(|i| i.id).collect();
    let mut tags = state.inventories.tags_for(&ids).await?;

    let body = inventories
        .into_iter()
        .map(|model| {
            let names = tags.remove(&model.id).unwrap_or_default();
            InventoryResponse::new(model, names)
        })
        .collect();
    Ok(Json(ApiResponse::success(body)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/{inventory_id}",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    responses(
        (status = 200, description = "Inventory fetched", body = ApiResponse<InventoryResponse>),
        (status = 404, description = "Inventory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> ApiResult<InventoryResponse> {
    let inventory = state.inventories.get_inventory(inventory_id).await?;
    inventory_response(&state, inventory).await
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventories/{inventory_id}",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    request_body = UpdateInventoryBody,
    responses(
        (status = 200, description = "Inventory updated", body = ApiResponse<InventoryResponse>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryBody>,
) -> ApiResult<InventoryResponse> {
    state.access.ensure_owner(inventory_id, user_id).await?;
    let updated = state
        .inventories
        .update_inventory(inventory_id, payload.changes, payload.expected_version)
        .await?;
    inventory_response(&state, updated).await
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventories/{inventory_id}",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID"), VersionQuery),
    responses(
        (status = 204, description = "Inventory and everything in it deleted"),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
) -> Result<StatusCode, ServiceError> {
    state.access.ensure_owner(inventory_id, user_id).await?;
    state
        .inventories
        .delete_inventory(inventory_id, query.expected_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/inventories/{inventory_id}/custom-id-format",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    request_body = CustomIdFormatRequest,
    responses(
        (status = 200, description = "Format updated", body = ApiResponse<InventoryResponse>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn set_custom_id_format(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
    Json(payload): Json<CustomIdFormatRequest>,
) -> ApiResult<InventoryResponse> {
    state.access.ensure_owner(inventory_id, user_id).await?;
    let updated = state
        .inventories
        .set_custom_id_format(inventory_id, payload.format, payload.expected_version)
        .await?;
    inventory_response(&state, updated).await
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/{inventory_id}/access",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    responses(
        (status = 200, description = "Access grants", body = ApiResponse<Vec<AccessResponse>>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn list_access(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
) -> ApiResult<Vec<AccessResponse>> {
    state.access.ensure_owner(inventory_id, user_id).await?;
    let grants = state.access.list_access(inventory_id).await?;
    Ok(Json(ApiResponse::success(
        grants.into_iter().map(AccessResponse::from).collect(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventories/{inventory_id}/access/{user_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("user_id" = Uuid, Path, description = "User receiving the grant")
    ),
    request_body = GrantAccessRequest,
    responses(
        (status = 200, description = "Access granted", body = ApiResponse<AccessResponse>),
        (status = 403, description = "Not the owner", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn grant_access(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((inventory_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<GrantAccessRequest>,
) -> ApiResult<AccessResponse> {
    state.access.ensure_owner(inventory_id, actor).await?;
    let grant = state
        .access
        .grant_access(inventory_id, user_id, payload.can_write)
        .await?;
    Ok(Json(ApiResponse::success(grant.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventories/{inventory_id}/access/{user_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("user_id" = Uuid, Path, description = "User losing the grant")
    ),
    responses(
        (status = 204, description = "Access revoked"),
        (status = 404, description = "No grant for this user", body = crate::errors::ErrorResponse)
    ),
    tag = "inventories"
)]
pub async fn revoke_access(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((inventory_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state.access.ensure_owner(inventory_id, actor).await?;
    if state.access.revoke_access(inventory_id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServiceError::NotFound(format!(
            "User {} has no access grant on inventory {}",
            user_id, inventory_id
        )))
    }
}

use crate::{
    errors::ServiceError,
    handlers::Actor,
    services::fields::{FieldUpdate, NewField},
    slots::{FieldDefinition, FieldType},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "5b0e8400-e29b-41d4-a716-446655440000",
    "name": "Weight",
    "field_type": "number",
    "slot": "number1",
    "order_index": 0,
    "required": false,
    "show_in_summary": true,
    "description": "grams",
    "created_at": "2024-03-15T10:30:00Z"
}))]
pub struct FieldResponse {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub name: String,
    pub field_type: FieldType,
    /// Physical slot holding this field's values
    pub slot: String,
    pub order_index: i32,
    pub required: bool,
    pub show_in_summary: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FieldDefinition> for FieldResponse {
    fn from(field: FieldDefinition) -> Self {
        Self {
            id: field.id,
            inventory_id: field.inventory_id,
            field_type: field.field_type(),
            slot: field.slot().to_string(),
            name: field.name,
            order_index: field.order_index,
            required: field.required,
            show_in_summary: field.show_in_summary,
            description: field.description,
            created_at: field.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddFieldRequest {
    #[serde(flatten)]
    pub field: NewField,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFieldRequest {
    #[serde(flatten)]
    pub update: FieldUpdate,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderFieldsRequest {
    /// Every field id of the inventory, in the new order
    pub field_ids: Vec<Uuid>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VersionQuery {
    pub expected_version: Option<i32>,
}

fn field_list(fields: Vec<FieldDefinition>) -> Vec<FieldResponse> {
    fields.into_iter().map(FieldResponse::from).collect()
}

/// Fails with NotFound unless `field_id` belongs to `inventory_id`.
async fn ensure_field_in_inventory(
    state: &AppState,
    inventory_id: Uuid,
    field_id: Uuid,
) -> Result<(), ServiceError> {
    let field = state.fields.get_field(field_id).await?;
    if field.inventory_id != inventory_id {
        return Err(ServiceError::NotFound(format!("Field {} not found", field_id)));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/inventories/{inventory_id}/fields",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    responses(
        (status = 200, description = "Fields in display order", body = ApiResponse<Vec<FieldResponse>>),
        (status = 404, description = "Inventory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "fields"
)]
pub async fn list_fields(
    State(state): State<AppState>,
    Path(inventory_id): Path<Uuid>,
) -> ApiResult<Vec<FieldResponse>> {
    let fields = state.fields.list_fields(inventory_id).await?;
    Ok(Json(ApiResponse::success(field_list(fields))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventories/{inventory_id}/fields",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    request_body = AddFieldRequest,
    responses(
        (status = 200, description = "Field added", body = ApiResponse<FieldResponse>),
        (status = 403, description = "No write access", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name or stale version", body = crate::errors::ErrorResponse),
        (status = 422, description = "No free slot of this type", body = crate::errors::ErrorResponse)
    ),
    tag = "fields"
)]
pub async fn add_field(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
    Json(payload): Json<AddFieldRequest>,
) -> ApiResult<FieldResponse> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    let field = state
        .fields
        .add_field(inventory_id, payload.field, payload.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(field.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventories/{inventory_id}/fields/order",
    params(("inventory_id" = Uuid, Path, description = "Inventory ID")),
    request_body = ReorderFieldsRequest,
    responses(
        (status = 200, description = "Fields reordered", body = ApiResponse<Vec<FieldResponse>>),
        (status = 400, description = "Order does not list every field exactly once", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "fields"
)]
pub async fn reorder_fields(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path(inventory_id): Path<Uuid>,
    Json(payload): Json<ReorderFieldsRequest>,
) -> ApiResult<Vec<FieldResponse>> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    let fields = state
        .fields
        .reorder_fields(inventory_id, &payload.field_ids, payload.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(field_list(fields))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventories/{inventory_id}/fields/{field_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("field_id" = Uuid, Path, description = "Field ID")
    ),
    request_body = UpdateFieldRequest,
    responses(
        (status = 200, description = "Field updated", body = ApiResponse<FieldResponse>),
        (status = 404, description = "Field not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name or stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "fields"
)]
pub async fn update_field(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path((inventory_id, field_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateFieldRequest>,
) -> ApiResult<FieldResponse> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    ensure_field_in_inventory(&state, inventory_id, field_id).await?;
    let field = state
        .fields
        .update_field(field_id, payload.update, payload.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(field.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventories/{inventory_id}/fields/{field_id}",
    params(
        ("inventory_id" = Uuid, Path, description = "Inventory ID"),
        ("field_id" = Uuid, Path, description = "Field ID"),
        VersionQuery
    ),
    responses(
        (status = 204, description = "Field removed and its values cleared"),
        (status = 404, description = "Field not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale version", body = crate::errors::ErrorResponse)
    ),
    tag = "fields"
)]
pub async fn remove_field(
    State(state): State<AppState>,
    Actor(user_id): Actor,
    Path((inventory_id, field_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<VersionQuery>,
) -> Result<StatusCode, ServiceError> {
    state.access.ensure_can_write(inventory_id, user_id).await?;
    ensure_field_in_inventory(&state, inventory_id, field_id).await?;
    state
        .fields
        .remove_field(field_id, query.expected_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

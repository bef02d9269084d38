pub mod fields;
pub mod inventories;
pub mod items;

use crate::{errors::ServiceError, AppState};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use uuid::Uuid;

/// Header carrying the authenticated user's id, set by the upstream gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user performing the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("missing X-User-Id header".to_string()))?;
        let value = raw
            .to_str()
            .map_err(|_| ServiceError::Unauthorized("malformed X-User-Id header".to_string()))?;
        Uuid::parse_str(value.trim())
            .map(Actor)
            .map_err(|_| ServiceError::Unauthorized("X-User-Id must be a UUID".to_string()))
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelfmark API",
        version = "0.1.0",
        description = "Inventories with user-defined fields. Every field is stored in one of a fixed number of typed slots per item."
    ),
    paths(
        inventories::create_inventory,
        inventories::list_inventories,
        inventories::get_inventory,
        inventories::update_inventory,
        inventories::delete_inventory,
        inventories::set_custom_id_format,
        inventories::list_access,
        inventories::grant_access,
        inventories::revoke_access,
        fields::list_fields,
        fields::add_field,
        fields::reorder_fields,
        fields::update_field,
        fields::remove_field,
        items::list_items,
        items::create_item,
        items::get_item,
        items::update_item,
        items::delete_item,
        items::toggle_like,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::slots::FieldType,
        crate::services::inventories::CreateInventoryRequest,
        crate::services::inventories::UpdateInventoryRequest,
        crate::services::fields::NewField,
        crate::services::fields::FieldUpdate,
        crate::services::items::ItemView,
        crate::services::items::FieldValue,
        crate::services::items::LikeStatus,
        inventories::InventoryResponse,
        inventories::UpdateInventoryBody,
        inventories::AccessResponse,
        fields::FieldResponse,
    )),
    tags(
        (name = "inventories", description = "Inventories, settings and access grants"),
        (name = "fields", description = "Custom field definitions"),
        (name = "items", description = "Items and their field values")
    )
)]
pub struct ApiDoc;

/// Routes under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/inventories",
            get(inventories::list_inventories).post(inventories::create_inventory),
        )
        .route(
            "/inventories/:inventory_id",
            get(inventories::get_inventory)
                .patch(inventories::update_inventory)
                .delete(inventories::delete_inventory),
        )
        .route(
            "/inventories/:inventory_id/custom-id-format",
            put(inventories::set_custom_id_format),
        )
        .route("/inventories/:inventory_id/access", get(inventories::list_access))
        .route(
            "/inventories/:inventory_id/access/:user_id",
            put(inventories::grant_access).delete(inventories::revoke_access),
        )
        .route(
            "/inventories/:inventory_id/fields",
            get(fields::list_fields).post(fields::add_field),
        )
        .route(
            "/inventories/:inventory_id/fields/order",
            put(fields::reorder_fields),
        )
        .route(
            "/inventories/:inventory_id/fields/:field_id",
            patch(fields::update_field).delete(fields::remove_field),
        )
        .route(
            "/inventories/:inventory_id/items",
            get(items::list_items).post(items::create_item),
        )
        .route(
            "/inventories/:inventory_id/items/:item_id",
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        .route(
            "/inventories/:inventory_id/items/:item_id/like",
            post(items::toggle_like),
        )
}

/// Full application router
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match crate::db::check_connection(&state.db).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "database unavailable"),
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{Map, Value};
use shelfmark::{
    config::AppConfig,
    db,
    entities::inventory,
    handlers::{self, USER_ID_HEADER},
    services::{fields::NewField, inventories::CreateInventoryRequest},
    slots::FieldType,
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

/// Application state over a fresh, migrated in-memory SQLite database.
///
/// The pool holds a single connection: every connection to `sqlite::memory:`
/// opens its own empty database.
pub async fn test_state() -> AppState {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    AppState::new(Arc::new(pool), cfg)
}

pub async fn create_inventory(
    state: &AppState,
    owner: Uuid,
    custom_id_format: Option<&str>,
) -> inventory::Model {
    state
        .inventories
        .create_inventory(
            owner,
            CreateInventoryRequest {
                title: "Workshop tools".to_string(),
                description: None,
                custom_id_format: custom_id_format.map(str::to_string),
                tags: Vec::new(),
            },
        )
        .await
        .expect("create inventory")
}

pub fn new_field(name: &str, field_type: FieldType) -> NewField {
    NewField {
        name: name.to_string(),
        field_type,
        required: false,
        show_in_summary: true,
        description: None,
        order_index: None,
    }
}

/// Turns a JSON object literal into a value map.
pub fn values(raw: Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Router plus the state behind it, for request-level tests.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = test_state().await;
        Self {
            router: handlers::app_router(state.clone()),
            state,
        }
    }

    /// Sends a request as `user` and returns the status and the parsed body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }
}

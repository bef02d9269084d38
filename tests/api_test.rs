mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_inventory(app: &TestApp, owner: Uuid) -> String {
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/inventories",
            Some(owner),
            Some(json!({"title": "Lab equipment", "custom_id_format": "LAB-{0000}"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));

    let (status, doc) = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]
        .as_object()
        .unwrap()
        .contains_key("/api/v1/inventories/{inventory_id}/fields"));
}

#[tokio::test]
async fn requests_without_user_are_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/inventories",
            None,
            Some(json!({"title": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn field_and_item_round_trip_over_http() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let inventory_id = create_inventory(&app, owner).await;
    let base = format!("/api/v1/inventories/{}", inventory_id);

    let (status, field) = app
        .request(
            Method::POST,
            &format!("{}/fields", base),
            Some(owner),
            Some(json!({"name": "Voltage", "field_type": "number"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", field);
    assert_eq!(field["data"]["slot"], "number1");

    let (status, item) = app
        .request(
            Method::POST,
            &format!("{}/items", base),
            Some(owner),
            Some(json!({"values": {"Voltage": "230"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", item);
    assert_eq!(item["data"]["custom_id"], "LAB-0001");
    assert_eq!(item["data"]["values"][0]["value"], json!(230.0));

    let item_id = item["data"]["id"].as_str().unwrap();
    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("{}/items/{}", base, item_id),
            Some(owner),
            Some(json!({"values": {"Voltage": "high"}})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    let (status, liked) = app
        .request(
            Method::POST,
            &format!("{}/items/{}/like", base, item_id),
            Some(Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["data"]["like_count"], 1);
}

#[tokio::test]
async fn exhausted_slots_and_duplicates_map_to_statuses() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let inventory_id = create_inventory(&app, owner).await;
    let fields_uri = format!("/api/v1/inventories/{}/fields", inventory_id);

    for name in ["a", "b", "c"] {
        let (status, _) = app
            .request(
                Method::POST,
                &fields_uri,
                Some(owner),
                Some(json!({"name": name, "field_type": "link"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .request(
            Method::POST,
            &fields_uri,
            Some(owner),
            Some(json!({"name": "d", "field_type": "link"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["message"],
        "Maximum number of link fields reached for this inventory"
    );

    let (status, _) = app
        .request(
            Method::POST,
            &fields_uri,
            Some(owner),
            Some(json!({"name": "a", "field_type": "text"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn writes_need_owner_or_write_grant() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let editor = Uuid::new_v4();
    let inventory_id = create_inventory(&app, owner).await;
    let fields_uri = format!("/api/v1/inventories/{}/fields", inventory_id);
    let new_field = json!({"name": "Serial", "field_type": "text"});

    let (status, _) = app
        .request(Method::POST, &fields_uri, Some(editor), Some(new_field.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let grant_uri = format!("/api/v1/inventories/{}/access/{}", inventory_id, editor);
    let (status, _) = app
        .request(
            Method::PUT,
            &grant_uri,
            Some(editor),
            Some(json!({"can_write": true})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "only the owner grants access");

    let (status, grant) = app
        .request(
            Method::PUT,
            &grant_uri,
            Some(owner),
            Some(json!({"can_write": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grant["data"]["can_write"], true);

    let (status, _) = app
        .request(Method::POST, &fields_uri, Some(editor), Some(new_field.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::DELETE, &grant_uri, Some(owner), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(
            Method::POST,
            &fields_uri,
            Some(editor),
            Some(json!({"name": "Batch", "field_type": "text"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn field_from_another_inventory_is_not_found() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let first = create_inventory(&app, owner).await;
    let second = create_inventory(&app, owner).await;

    let (_, field) = app
        .request(
            Method::POST,
            &format!("/api/v1/inventories/{}/fields", first),
            Some(owner),
            Some(json!({"name": "Serial", "field_type": "text"})),
        )
        .await;
    let field_id = field["data"]["id"].as_str().unwrap();

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/inventories/{}/fields/{}", second, field_id),
            Some(owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_lists_edits_and_deletes_inventories() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let inventory_id = create_inventory(&app, owner).await;
    let uri = format!("/api/v1/inventories/{}", inventory_id);

    let (status, listed) = app
        .request(Method::GET, "/api/v1/inventories", Some(owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["tags"], json!([]));

    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            Some(stranger),
            Some(json!({"title": "Mine now"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(
            Method::PATCH,
            &uri,
            Some(owner),
            Some(json!({"title": "Bench kit", "tags": ["lab", "lab"], "expected_version": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["data"]["title"], "Bench kit");
    assert_eq!(updated["data"]["tags"], json!(["lab"]));
    assert_eq!(updated["data"]["version"], 2);

    let (status, _) = app
        .request(Method::DELETE, &format!("{}?expected_version=1", uri), Some(owner), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.request(Method::DELETE, &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.request(Method::GET, &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

mod common;

use assert_matches::assert_matches;
use common::{create_inventory, new_field, test_state, values};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use shelfmark::{
    entities::{
        inventory_access, inventory_field, inventory_has_tag, inventory_item, inventory_tag,
        item_like,
    },
    errors::ServiceError,
    services::inventories::{CreateInventoryRequest, UpdateInventoryRequest},
    slots::FieldType,
};
use uuid::Uuid;

fn tagged(title: &str, tags: &[&str]) -> CreateInventoryRequest {
    CreateInventoryRequest {
        title: title.to_string(),
        description: Some("  shelf B  ".to_string()),
        custom_id_format: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn listing_shows_owned_and_granted_inventories() {
    let state = test_state().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let own = create_inventory(&state, alice, None).await;
    let shared = create_inventory(&state, bob, None).await;
    let private = create_inventory(&state, bob, None).await;
    state
        .access
        .grant_access(shared.id, alice, false)
        .await
        .unwrap();

    let mut visible: Vec<Uuid> = state
        .inventories
        .list_inventories(alice)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    visible.sort();
    let mut expected = vec![own.id, shared.id];
    expected.sort();
    assert_eq!(visible, expected);
    assert!(!visible.contains(&private.id));

    let nobody = state.inventories.list_inventories(Uuid::new_v4()).await.unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn tags_are_shared_and_replaced_as_a_set() {
    let state = test_state().await;
    let owner = Uuid::new_v4();

    let garage = state
        .inventories
        .create_inventory(owner, tagged("Garage", &["tools", " garage ", "tools"]))
        .await
        .unwrap();
    assert_eq!(garage.description.as_deref(), Some("shelf B"));
    let shed = state
        .inventories
        .create_inventory(owner, tagged("Shed", &["tools"]))
        .await
        .unwrap();

    assert_eq!(
        state.inventories.list_tags(garage.id).await.unwrap(),
        vec!["garage", "tools"]
    );
    assert_eq!(state.inventories.list_tags(shed.id).await.unwrap(), vec!["tools"]);
    assert_eq!(inventory_tag::Entity::find().count(&*state.db).await.unwrap(), 2);

    state
        .inventories
        .update_inventory(
            garage.id,
            UpdateInventoryRequest {
                tags: Some(vec!["paint".to_string()]),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let tags = state.inventories.tags_for(&[garage.id, shed.id]).await.unwrap();
    assert_eq!(tags[&garage.id], vec!["paint"]);
    assert_eq!(tags[&shed.id], vec!["tools"]);
}

#[tokio::test]
async fn update_is_partial_and_version_guarded() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let inventory = state
        .inventories
        .create_inventory(owner, tagged("Garage", &["tools"]))
        .await
        .unwrap();

    let renamed = state
        .inventories
        .update_inventory(
            inventory.id,
            UpdateInventoryRequest {
                title: Some(" Workshop ".to_string()),
                ..Default::default()
            },
            Some(inventory.version),
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "Workshop");
    assert_eq!(renamed.description.as_deref(), Some("shelf B"));
    assert_eq!(renamed.version, inventory.version + 1);
    assert_eq!(state.inventories.list_tags(inventory.id).await.unwrap(), vec!["tools"]);

    let stale = state
        .inventories
        .update_inventory(
            inventory.id,
            UpdateInventoryRequest {
                description: Some(String::new()),
                ..Default::default()
            },
            Some(inventory.version),
        )
        .await;
    assert_matches!(stale, Err(ServiceError::ConcurrentModification(id)) if id == inventory.id);

    let cleared = state
        .inventories
        .update_inventory(
            inventory.id,
            UpdateInventoryRequest {
                description: Some(String::new()),
                ..Default::default()
            },
            Some(renamed.version),
        )
        .await
        .unwrap();
    assert_eq!(cleared.description, None);

    let blank = state
        .inventories
        .update_inventory(
            inventory.id,
            UpdateInventoryRequest {
                title: Some("   ".to_string()),
                ..Default::default()
            },
            None,
        )
        .await;
    assert_matches!(blank, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn deleting_an_inventory_removes_everything_in_it() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let doomed = state
        .inventories
        .create_inventory(owner, tagged("Doomed", &["tools"]))
        .await
        .unwrap();
    let survivor = create_inventory(&state, owner, None).await;

    for inventory_id in [doomed.id, survivor.id] {
        state
            .fields
            .add_field(inventory_id, new_field("Title", FieldType::Text), None)
            .await
            .unwrap();
        let item = state
            .items
            .create_item(inventory_id, owner, &values(json!({"Title": "Drill"})))
            .await
            .unwrap();
        state.items.toggle_like(item.id, Uuid::new_v4()).await.unwrap();
    }
    state
        .access
        .grant_access(doomed.id, Uuid::new_v4(), true)
        .await
        .unwrap();

    let stale = state.inventories.delete_inventory(doomed.id, Some(0)).await;
    assert_matches!(stale, Err(ServiceError::ConcurrentModification(_)));

    state.inventories.delete_inventory(doomed.id, None).await.unwrap();

    assert_matches!(
        state.inventories.get_inventory(doomed.id).await,
        Err(ServiceError::NotFound(_))
    );
    let db = &*state.db;
    assert_eq!(inventory_field::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(inventory_item::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(item_like::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(inventory_access::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(inventory_has_tag::Entity::find().count(db).await.unwrap(), 0);
    // the tag itself stays for other inventories
    assert_eq!(inventory_tag::Entity::find().count(db).await.unwrap(), 1);

    assert_eq!(state.items.list_items(survivor.id).await.unwrap().len(), 1);
    assert_matches!(
        state.inventories.delete_inventory(doomed.id, None).await,
        Err(ServiceError::NotFound(_))
    );
}

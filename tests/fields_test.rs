mod common;

use assert_matches::assert_matches;
use common::{create_inventory, new_field, test_state, values};
use serde_json::json;
use shelfmark::{
    errors::ServiceError,
    services::fields::{FieldUpdate, NewField},
    slots::{FieldType, SlotValue},
};
use uuid::Uuid;

#[tokio::test]
async fn fields_take_the_lowest_free_slot_of_their_type() {
    let state = test_state().await;
    let inventory = create_inventory(&state, Uuid::new_v4(), None).await;

    let title = state
        .fields
        .add_field(inventory.id, new_field("Title", FieldType::Text), None)
        .await
        .unwrap();
    let weight = state
        .fields
        .add_field(inventory.id, new_field("Weight", FieldType::Number), None)
        .await
        .unwrap();
    let brand = state
        .fields
        .add_field(inventory.id, new_field("Brand", FieldType::Text), None)
        .await
        .unwrap();

    assert_eq!(title.slot().to_string(), "text1");
    assert_eq!(weight.slot().to_string(), "number1");
    assert_eq!(brand.slot().to_string(), "text2");
    assert_eq!(brand.field_type(), FieldType::Text);
    assert!(brand.show_in_summary);
    assert_eq!(
        [title.order_index, weight.order_index, brand.order_index],
        [0, 1, 2]
    );
}

#[tokio::test]
async fn fourth_field_of_a_type_is_rejected() {
    let state = test_state().await;
    let inventory = create_inventory(&state, Uuid::new_v4(), None).await;

    for name in ["In stock", "Fragile", "Sealed"] {
        state
            .fields
            .add_field(inventory.id, new_field(name, FieldType::Boolean), None)
            .await
            .unwrap();
    }

    let result = state
        .fields
        .add_field(inventory.id, new_field("Returned", FieldType::Boolean), None)
        .await;
    assert_matches!(result, Err(ServiceError::SlotsExhausted(FieldType::Boolean)));

    // other families are unaffected
    let link = state
        .fields
        .add_field(inventory.id, new_field("Manual", FieldType::Link), None)
        .await
        .unwrap();
    assert_eq!(link.slot().to_string(), "link1");
}

#[tokio::test]
async fn duplicate_names_are_rejected_case_sensitively() {
    let state = test_state().await;
    let inventory = create_inventory(&state, Uuid::new_v4(), None).await;
    state
        .fields
        .add_field(inventory.id, new_field("Colour", FieldType::Text), None)
        .await
        .unwrap();

    let duplicate = state
        .fields
        .add_field(inventory.id, new_field("  Colour ", FieldType::LongText), None)
        .await;
    assert_matches!(duplicate, Err(ServiceError::DuplicateFieldName(name)) if name == "Colour");

    state
        .fields
        .add_field(inventory.id, new_field("colour", FieldType::Text), None)
        .await
        .unwrap();

    // same name in another inventory is fine
    let other = create_inventory(&state, Uuid::new_v4(), None).await;
    state
        .fields
        .add_field(other.id, new_field("Colour", FieldType::Text), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn reused_slot_does_not_expose_old_values() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let inventory = create_inventory(&state, owner, None).await;

    let a = state
        .fields
        .add_field(inventory.id, new_field("A", FieldType::Text), None)
        .await
        .unwrap();
    assert_eq!(a.slot().to_string(), "text1");

    let item = state
        .items
        .create_item(inventory.id, owner, &values(json!({"A": "hello"})))
        .await
        .unwrap();
    assert_eq!(item.value("A"), Some(&SlotValue::Text("hello".into())));

    state.fields.remove_field(a.id, None).await.unwrap();

    let b = state
        .fields
        .add_field(inventory.id, new_field("B", FieldType::Text), None)
        .await
        .unwrap();
    assert_eq!(b.slot().to_string(), "text1");

    let reread = state.items.get_item(item.id).await.unwrap();
    assert_eq!(reread.value("B"), Some(&SlotValue::Null));
    assert_eq!(reread.value("A"), None);
}

#[tokio::test]
async fn removing_a_field_leaves_other_slots_alone() {
    let state = test_state().await;
    let owner = Uuid::new_v4();
    let inventory = create_inventory(&state, owner, None).await;
    let first = state
        .fields
        .add_field(inventory.id, new_field("First", FieldType::Number), None)
        .await
        .unwrap();
    state
        .fields
        .add_field(inventory.id, new_field("Second", FieldType::Number), None)
        .await
        .unwrap();

    let item = state
        .items
        .create_item(
            inventory.id,
            owner,
            &values(json!({"First": 1, "Second": "2.5"})),
        )
        .await
        .unwrap();

    state.fields.remove_field(first.id, None).await.unwrap();

    let reread = state.items.get_item(item.id).await.unwrap();
    assert_eq!(reread.values.len(), 1);
    assert_eq!(reread.value("Second"), Some(&SlotValue::Number(2.5)));
}

#[tokio::test]
async fn reorder_requires_the_complete_field_set() {
    let state = test_state().await;
    let inventory = create_inventory(&state, Uuid::new_v4(), None).await;
    let mut ids = Vec::new();
    for (name, ty) in [
        ("Title", FieldType::Text),
        ("Weight", FieldType::Number),
        ("Notes", FieldType::LongText),
    ] {
        ids.push(
            state
                .fields
                .add_field(inventory.id, new_field(name, ty), None)
                .await
                .unwrap()
                .id,
        );
    }
    let before = state.inventories.get_inventory(inventory.id).await.unwrap();

    let partial = state
        .fields
        .reorder_fields(inventory.id, &[ids[2], ids[0]], None)
        .await;
    assert_matches!(partial, Err(ServiceError::ValidationError(_)));

    let foreign = state
        .fields
        .reorder_fields(inventory.id, &[ids[2], ids[0], Uuid::new_v4()], None)
        .await;
    assert_matches!(foreign, Err(ServiceError::ValidationError(_)));

    let unchanged = state.fields.list_fields(inventory.id).await.unwrap();
    let names: Vec<&str> = unchanged.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Title", "Weight", "Notes"]);
    let after_failures = state.inventories.get_inventory(inventory.id).await.unwrap();
    assert_eq!(after_failures.version, before.version);

    let reordered = state
        .fields
        .reorder_fields(inventory.id, &[ids[2], ids[0], ids[1]], None)
        .await
        .unwrap();
    let names: Vec<&str> = reordered.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Notes", "Title", "Weight"]);

    let listed = state.fields.list_fields(inventory.id).await.unwrap();
    assert_eq!(
        listed.iter().map(|f| f.order_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(listed[0].name, "Notes");
}

#[tokio::test]
async fn stale_inventory_version_is_a_concurrent_modification() {
    let state = test_state().await;
    let inventory = create_inventory(&state, Uuid::new_v4(), None).await;
    assert_eq!(inventory.version, 1);

    let field = state
        .fields
        .add_field(inventory.id, new_field("Title", FieldType::Text), Some(1))
        .await
        .unwrap();
    let bumped = state.inventories.get_inventory(inventory.id).await.unwrap();
    assert_eq!(bumped.version, 2);

    // a second editor still holding version 1
    let stale = state
        .fields
        .reorder_fields(inventory.id, &[field.id], Some(1))
        .await;
    assert_matches!(stale, Err(ServiceError::ConcurrentModification(id)) if id == inventory.id);

    let stale_remove = state.fields.remove_field(field.id, Some(1)).await;
    assert_matches!(stale_remove, Err(ServiceError::ConcurrentModification(_)));
    assert!(state.fields.get_field(field.id).await.is_ok());

    state
        .fields
        .reorder_fields(inventory.id, &[field.id], Some(2))
        .await
        .unwrap();
    let current = state.inventories.get_inventory(inventory.id).await.unwrap();
    assert_eq!(current.version, 3);
}

#[tokio::test]
async fn update_changes_metadata_but_never_the_slot() {
    let state = test_state().await;
    let inventory = create_inventory(&state, Uuid::new_v4(), None).await;
    let field = state
        .fields
        .add_field(
            inventory.id,
            NewField {
                description: Some("in grams".into()),
                ..new_field("Weight", FieldType::Number)
            },
            None,
        )
        .await
        .unwrap();
    state
        .fields
        .add_field(inventory.id, new_field("Height", FieldType::Number), None)
        .await
        .unwrap();

    let updated = state
        .fields
        .update_field(
            field.id,
            FieldUpdate {
                name: Some(" Mass ".into()),
                required: Some(true),
                show_in_summary: Some(false),
                description: Some(String::new()),
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Mass");
    assert!(updated.required);
    assert!(!updated.show_in_summary);
    assert_eq!(updated.description, None);
    assert_eq!(updated.slot(), field.slot());

    let clash = state
        .fields
        .update_field(
            field.id,
            FieldUpdate {
                name: Some("Height".into()),
                ..Default::default()
            },
            None,
        )
        .await;
    assert_matches!(clash, Err(ServiceError::DuplicateFieldName(_)));
}

#[tokio::test]
async fn unknown_inventory_and_field_are_not_found() {
    let state = test_state().await;

    assert_matches!(
        state
            .fields
            .add_field(Uuid::new_v4(), new_field("Title", FieldType::Text), None)
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        state.fields.list_fields(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        state.fields.remove_field(Uuid::new_v4(), None).await,
        Err(ServiceError::NotFound(_))
    );
}

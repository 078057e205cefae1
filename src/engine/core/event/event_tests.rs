use crate::engine::core::event::event::{literal_matches, value_as_f64, value_to_key};
use crate::engine::core::{Entity, Event};
use crate::engine::errors::StoreError;
use crate::test_helpers::factory::Factory;
use serde_json::json;

fn create_test_event() -> Event {
    Event::new("purchase", 1704067200).with_payload(json!({
        "string_field": "value",
        "number_field": 42,
        "numeric_string": "7.5",
        "float_field": 3.14,
        "bool_field": true,
        "null_field": null
    }))
}

#[test]
fn test_validate() {
    assert!(create_test_event().validate().is_ok());

    let blank = Event::new("  ", 0);
    assert!(matches!(blank.validate(), Err(StoreError::InvalidEvent(_))));

    let bad_payload = Event::new("purchase", 0).with_payload(json!([1, 2]));
    assert!(matches!(
        bad_payload.validate(),
        Err(StoreError::InvalidEvent(_))
    ));
}

#[test]
fn test_get_field_resolves_core_fields_and_payload() {
    let event = create_test_event();
    assert_eq!(event.get_field("name"), Some(json!("purchase")));
    assert_eq!(event.get_field("timestamp"), Some(json!(1704067200)));
    assert_eq!(event.get_field("number_field"), Some(json!(42)));
    assert_eq!(event.get_field("null_field"), None);
    assert_eq!(event.get_field("missing"), None);
}

#[test]
fn test_scalar_helpers() {
    assert_eq!(value_as_f64(&json!("3")), Some(3.0));
    assert_eq!(value_as_f64(&json!(false)), Some(0.0));
    assert_eq!(value_as_f64(&json!({"a": 1})), None);
    assert_eq!(value_to_key(&json!(12)), "12");
    assert_eq!(value_to_key(&json!("x")), "x");
}

#[test]
fn test_literal_matches_is_loose_across_types() {
    assert!(literal_matches(&json!(1), &json!(1.0)));
    assert!(literal_matches(&json!("1"), &json!(1)));
    assert!(literal_matches(&json!("card"), &json!("card")));
    assert!(literal_matches(&json!(true), &json!("true")));
    assert!(!literal_matches(&json!(true), &json!(1)));
    assert!(!literal_matches(&json!("card"), &json!("cash")));
    assert!(!literal_matches(&json!(null), &json!("")));
}

#[test]
fn test_entity_accessors() {
    let entity = Factory::entity()
        .with_id("u1")
        .with_attr("plan", "pro")
        .with_attr("cleared", json!(null))
        .with_ab("checkout", 1)
        .with_event(Event::new("b", 20))
        .with_event(Event::new("a", 10))
        .with_event(Event::new("c", 20))
        .create();

    assert_eq!(entity.attribute("plan"), Some(&json!("pro")));
    assert_eq!(entity.attribute("cleared"), None);
    assert_eq!(entity.variant("checkout"), Some(1));
    assert_eq!(entity.variant("other"), None);

    let order: Vec<&str> = entity
        .events_chronological()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[test]
fn test_entity_validate() {
    assert!(matches!(
        Entity::new("").validate(),
        Err(StoreError::InvalidEntityId)
    ));
    let mut entity = Entity::new("u1");
    entity.events.push(Event::new("", 0));
    assert!(matches!(entity.validate(), Err(StoreError::InvalidEvent(_))));
}

#[test]
fn test_entity_deserializes_with_defaults() {
    let entity: Entity = serde_json::from_value(json!({
        "id": "u9",
        "events": [{"name": "login", "timestamp": 5}]
    }))
    .unwrap();
    assert!(entity.attributes.is_empty());
    assert_eq!(entity.events[0].payload, json!({}));
}

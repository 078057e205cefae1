use crate::test_helpers::factory::Factory;
use serde_json::json;

#[test]
fn test_entity_factory() {
    let entity = Factory::entity()
        .with_id("u1")
        .with_attr("gender", "Female")
        .with_ab("checkout", 2)
        .with_repeated("login", 3, 1704067200)
        .with_event(Factory::event().with("name", "purchase").create())
        .create();

    assert_eq!(entity.id, "u1");
    assert_eq!(entity.attribute("gender"), Some(&json!("Female")));
    assert_eq!(entity.variant("checkout"), Some(2));
    assert_eq!(entity.events.len(), 4);
}

#[test]
fn test_entity_factory_unique_ids() {
    let a = Factory::entity().create();
    let b = Factory::entity().create();
    assert_ne!(a.id, b.id);
}

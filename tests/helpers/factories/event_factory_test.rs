use crate::test_helpers::factory::Factory;
use serde_json::json;

#[test]
fn test_event_factory() {
    let event = Factory::event()
        .with("name", "purchase")
        .with("timestamp", 1706745600)
        .with_field("amount", 12)
        .with_field("method", "card")
        .create();

    assert_eq!(event.name, "purchase");
    assert_eq!(event.timestamp, 1706745600);
    assert_eq!(event.payload, json!({"amount": 12, "method": "card"}));
}

#[test]
fn test_event_factory_list() {
    let mut events = Factory::event().with("name", "played").create_list(5);
    assert_eq!(events.len(), 5);
    events.sort_by_key(|e| e.timestamp);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.name, "played");
        assert_eq!(event.payload["index"], json!(i));
    }
}

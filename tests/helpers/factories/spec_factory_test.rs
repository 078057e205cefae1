use crate::test_helpers::factory::Factory;
use serde_json::json;

#[test]
fn test_spec_factory() {
    let spec = Factory::spec()
        .with("query", json!({"gender": "Male"}))
        .with_group(json!({"meta": "created_at", "format": "weekly"}))
        .with_calc(json!({"calc": "avg", "attr": "played"}))
        .create();

    assert_eq!(spec.group.len(), 1);
    assert_eq!(spec.calc[0].calc.as_deref(), Some("avg"));
    assert!(spec.action.is_none());
}

#[test]
fn test_retention_spec_factory() {
    let spec = Factory::retention_spec().with("periods", 3).create();
    assert_eq!(spec.action.as_deref(), Some("signedin"));
    assert_eq!(spec.periods, Some(3));
    assert_eq!(spec.group[0].format.as_deref(), Some("monthly"));
}

use crate::command::types::RawSpec;
use serde_json::{Value, json};
use std::collections::HashMap;

/// Builds `RawSpec` values through their JSON form.
pub struct SpecFactory {
    params: HashMap<String, Value>,
    group: Vec<Value>,
    calc: Vec<Value>,
}

impl SpecFactory {
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            group: Vec::new(),
            calc: Vec::new(),
        }
    }

    pub fn retention() -> Self {
        Self::new()
            .with("action", "signedin")
            .with_group(json!({"meta": "created_at", "format": "monthly"}))
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_group(mut self, dimension: Value) -> Self {
        self.group.push(dimension);
        self
    }

    pub fn with_calc(mut self, metric: Value) -> Self {
        self.calc.push(metric);
        self
    }

    pub fn create(self) -> RawSpec {
        let mut doc = serde_json::Map::new();
        doc.extend(self.params);
        doc.insert("group".into(), Value::Array(self.group));
        doc.insert("calc".into(), Value::Array(self.calc));
        serde_json::from_value(Value::Object(doc)).unwrap()
    }
}

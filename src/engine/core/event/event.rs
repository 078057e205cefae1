use crate::engine::errors::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A timestamped occurrence recorded against one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub name: String,
    /// Epoch seconds
    pub timestamp: i64,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

impl Event {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            payload: empty_payload(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            warn!(target: "snel_cohort::event::validate", "Invalid event name: empty");
            return Err(StoreError::InvalidEvent("empty name".to_string()));
        }
        if !self.payload.is_object() {
            warn!(target: "snel_cohort::event::validate", event = %self.name, "Payload is not an object");
            return Err(StoreError::InvalidEvent(format!(
                "payload of '{}' must be an object",
                self.name
            )));
        }
        Ok(())
    }

    /// Looks up an attribute; `timestamp` and `name` resolve to the core fields.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::String(self.name.clone())),
            "timestamp" => Some(Value::Number(self.timestamp.into())),
            _ => self.payload.get(name).filter(|v| !v.is_null()).cloned(),
        }
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Stable string form of a scalar JSON value, used for grouping and literal matching.
pub fn value_to_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loose literal equality: `1`, `1.0` and `"1"` all match each other.
pub fn literal_matches(value: &Value, literal: &Value) -> bool {
    if value == literal {
        return true;
    }
    match (value_as_f64(value), value_as_f64(literal)) {
        (Some(a), Some(b)) if !value.is_boolean() && !literal.is_boolean() => a == b,
        _ => !value.is_null() && value_to_key(value) == value_to_key(literal),
    }
}

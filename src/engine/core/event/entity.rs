use super::event::Event;
use crate::engine::errors::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The subject under analysis: scalar attributes, AB assignments and an event history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// AB test name -> variant index
    #[serde(default)]
    pub ab: BTreeMap<String, i64>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id.trim().is_empty() {
            return Err(StoreError::InvalidEntityId);
        }
        self.events.iter().try_for_each(Event::validate)
    }

    /// Attribute value, treating JSON null as absent
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    pub fn variant(&self, test: &str) -> Option<i64> {
        self.ab.get(test).copied()
    }

    /// Events ordered by timestamp; ties keep append order.
    pub fn events_chronological(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.events.iter().collect();
        events.sort_by_key(|e| e.timestamp);
        events
    }
}

use crate::engine::core::{Entity, Event};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub struct EntityFactory {
    entity: Entity,
}

impl EntityFactory {
    pub fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            entity: Entity::new(format!("entity-{}", id)),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.entity.id = id.to_string();
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entity.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_ab(mut self, test: &str, variant: i64) -> Self {
        self.entity.ab.insert(test.to_string(), variant);
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.entity.events.push(event);
        self
    }

    /// Appends `count` bare events named `name` at `timestamp`.
    pub fn with_repeated(mut self, name: &str, count: usize, timestamp: i64) -> Self {
        self.entity
            .events
            .extend((0..count).map(|_| Event::new(name, timestamp)));
        self
    }

    pub fn create(self) -> Entity {
        self.entity
    }
}

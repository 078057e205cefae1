use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::filter::RecordFilter;
use super::RecordStore;
use crate::engine::core::{Entity, Event};
use crate::engine::errors::StoreError;
use crate::engine::executor::Report;
use crate::engine::plan::naming::sanitize;
use crate::shared::config::StoreConfig;

/// Entity store kept in memory, in insertion order.
pub struct InMemoryStore {
    config: StoreConfig,
    entities: RwLock<IndexMap<String, Entity>>,
    reports: RwLock<HashMap<String, Report>>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            entities: RwLock::new(IndexMap::new()),
            reports: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.entities.read().get(id).cloned()
    }

    fn event_name(&self, name: &str) -> String {
        if self.config.normalize_event_names {
            sanitize(name)
        } else {
            name.trim().to_string()
        }
    }

    fn check_limit(&self, id: &str, current: usize, incoming: usize) -> Result<(), StoreError> {
        match self.config.max_events_per_entity {
            Some(limit) if current + incoming > limit => {
                warn!(target: "snel_cohort::store", id, limit, "Event limit reached");
                Err(StoreError::EventLimitExceeded {
                    id: id.to_string(),
                    limit,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn insert_entity(&self, mut entity: Entity) -> Result<(), StoreError> {
        entity.validate()?;
        for event in &mut entity.events {
            event.name = self.event_name(&event.name);
        }

        let mut entities = self.entities.write();
        if entities.contains_key(&entity.id) {
            return Err(StoreError::DuplicateEntity(entity.id));
        }
        self.check_limit(&entity.id, 0, entity.events.len())?;

        debug!(target: "snel_cohort::store", id = %entity.id, events = entity.events.len(), "Inserted entity");
        entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Merges `attributes` into the entity's profile, overwriting existing keys.
    pub fn update_profile(&self, id: &str, attributes: Map<String, Value>) -> Result<(), StoreError> {
        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;
        entity.attributes.extend(attributes);
        Ok(())
    }

    /// Appends an event. With `unique`, an event equal in name and payload
    /// (timestamp ignored) is not recorded twice. Returns whether it was stored.
    pub fn append_event(&self, id: &str, mut event: Event, unique: bool) -> Result<bool, StoreError> {
        event.validate()?;
        event.name = self.event_name(&event.name);

        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;

        if unique
            && entity
                .events
                .iter()
                .any(|e| e.name == event.name && e.payload == event.payload)
        {
            debug!(target: "snel_cohort::store", id, event = %event.name, "Skipped duplicate event");
            return Ok(false);
        }

        self.check_limit(id, entity.events.len(), 1)?;
        entity.events.push(event);
        Ok(true)
    }

    pub fn tag_abtest(&self, id: &str, test: &str, variant: i64) -> Result<(), StoreError> {
        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;
        entity.ab.insert(test.to_string(), variant);
        Ok(())
    }

    pub fn report(&self, collection: &str) -> Option<Report> {
        self.reports.read().get(collection).cloned()
    }
}

impl RecordStore for InMemoryStore {
    fn scan(&self, filter: &RecordFilter) -> Result<Vec<Entity>, StoreError> {
        let entities = self.entities.read();
        let matched: Vec<Entity> = entities
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        debug!(
            target: "snel_cohort::store",
            total = entities.len(),
            matched = matched.len(),
            "Scanned entities"
        );
        Ok(matched)
    }

    fn write_report(&self, collection: &str, report: &Report) -> Result<(), StoreError> {
        // Serialization failures surface as StoreError before the report is kept.
        let bytes = serde_json::to_vec(report)?;
        info!(target: "snel_cohort::store", collection, bytes = bytes.len(), "Stored report");
        self.reports
            .write()
            .insert(collection.to_string(), report.clone());
        Ok(())
    }
}

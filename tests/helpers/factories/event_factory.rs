use crate::engine::core::Event;
use rand::Rng;
use serde_json::{Value, json};
use std::collections::HashMap;

pub struct EventFactory {
    params: HashMap<String, Value>,
}

impl EventFactory {
    pub fn new() -> Self {
        let mut params = HashMap::new();
        params.insert("name".into(), json!("test_event"));
        // 2024-01-01T00:00:00Z
        params.insert("timestamp".into(), json!(1704067200));
        params.insert("payload".into(), json!({}));
        Self { params }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Sets one payload attribute, keeping the others.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Some(obj) = self
            .params
            .get_mut("payload")
            .and_then(|p| p.as_object_mut())
        {
            obj.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn create(self) -> Event {
        Event::new(
            self.params["name"].as_str().unwrap(),
            self.params["timestamp"].as_i64().unwrap(),
        )
        .with_payload(self.params["payload"].clone())
    }

    /// `count` events one hour apart in random order, starting at the configured timestamp.
    pub fn create_list(self, count: usize) -> Vec<Event> {
        let start = self.params["timestamp"].as_i64().unwrap();
        let name = self.params["name"].as_str().unwrap().to_string();
        let mut events: Vec<Event> = (0..count)
            .map(|i| {
                let mut payload = self.params["payload"].clone();
                if let Some(obj) = payload.as_object_mut() {
                    obj.insert("index".into(), json!(i));
                }
                Event::new(name.clone(), start + 3600 * i as i64).with_payload(payload)
            })
            .collect();

        let mut rng = rand::thread_rng();
        for i in (1..events.len()).rev() {
            let j = rng.gen_range(0..=i);
            events.swap(i, j);
        }
        events
    }
}

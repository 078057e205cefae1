use crate::integration::matcher::Matcher;
use serde::Deserialize;
use serde_json::Value;
use snel_cohort::engine::core::Entity;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct TestScenario {
    pub name: String,
    /// Section overrides for the generated settings file
    pub config: Option<Value>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// JSON object, or a JSON/TOML document as a string
    pub spec: Value,
    #[serde(default = "default_collection")]
    pub collection: String,
    pub matchers: Vec<Matcher>,
}

fn default_collection() -> String {
    "reports".to_string()
}

pub fn load_scenarios_from_json(path: &str) -> Vec<TestScenario> {
    let content = fs::read_to_string(path).expect("Failed to read scenario file");
    serde_json::from_str(&content).expect("Invalid JSON format")
}

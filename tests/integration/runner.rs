use crate::integration::config::write_config_for;
use crate::integration::scenarios::TestScenario;
use serde_json::Value;
use snel_cohort::command::parser::parse_spec;
use snel_cohort::engine::store::InMemoryStore;
use snel_cohort::engine::{ExecutionError, Executor, ReportPipeline};
use snel_cohort::shared::config::load_settings;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Report JSON on success, `ERROR: ...` otherwise.
fn render(scenario: &TestScenario, store: Arc<InMemoryStore>, executor: Executor) -> String {
    let text = match &scenario.spec {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let raw = match parse_spec(&text) {
        Ok(raw) => raw,
        Err(e) => return format!("ERROR: {}", ExecutionError::from(e)),
    };

    let pipeline = ReportPipeline::new(store, executor);
    match pipeline.run(&scenario.collection, &raw) {
        Ok(report) => {
            let stored = pipeline.store().report(&scenario.collection);
            assert_eq!(stored.as_ref(), Some(&report), "report was not written back");
            serde_json::to_string_pretty(&report).unwrap()
        }
        Err(e) => format!("ERROR: {}", e),
    }
}

pub fn run_scenario(scenario: &TestScenario) {
    info!("▶ Running scenario: {}", scenario.name);
    let tmp = tempfile::tempdir().unwrap();
    let config_path = write_config_for(&scenario.name, tmp.path(), scenario.config.as_ref());
    debug!("Using config path: {}", config_path.display());

    let settings = load_settings(&config_path).expect("Failed to load scenario settings");
    let store = InMemoryStore::new(settings.store.clone());
    for entity in &scenario.entities {
        store
            .insert_entity(entity.clone())
            .expect("Failed to seed entity");
    }
    let executor = Executor::new(&settings).expect("Failed to build executor");

    let actual = render(scenario, Arc::new(store), executor);

    let failed: Vec<_> = scenario
        .matchers
        .iter()
        .filter(|m| !m.matches(&actual))
        .collect();
    if failed.is_empty() {
        info!("✅ Scenario '{}' passed", scenario.name);
    } else {
        error!(
            "Expected all matchers to pass. Failed: {:?}\nActual:\n{}",
            failed, actual
        );
        panic!("Scenario '{}' failed", scenario.name);
    }
}

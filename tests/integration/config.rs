use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
pub struct TestConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
    pub time: TimeConfig,
    pub store: StoreConfig,
}

#[derive(Serialize)]
pub struct EngineConfig {
    pub parallel: bool,
    pub worker_threads: usize,
}

#[derive(Serialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

#[derive(Serialize)]
pub struct TimeConfig {
    pub week_start: String,
}

#[derive(Serialize)]
pub struct StoreConfig {
    pub normalize_event_names: bool,
}

/// Writes `config.test.toml` under `dir`. Per-section keys in `overrides`
/// replace the defaults below.
pub fn write_config_for(name: &str, dir: &Path, overrides: Option<&Value>) -> PathBuf {
    let config = TestConfig {
        engine: EngineConfig {
            parallel: true,
            worker_threads: 4,
        },
        logging: LoggingConfig {
            log_dir: dir.join("logs").to_string_lossy().into_owned(),
            stdout_level: "debug".into(),
            file_level: "debug".into(),
        },
        time: TimeConfig {
            week_start: "Sun".into(),
        },
        store: StoreConfig {
            normalize_event_names: true,
        },
    };

    let mut doc = toml::Value::try_from(&config).unwrap();
    if let (Some(Value::Object(sections)), Some(table)) = (overrides, doc.as_table_mut()) {
        for (section, keys) in sections {
            let entry = table
                .entry(section.clone())
                .or_insert(toml::Value::Table(Default::default()));
            if let (Value::Object(keys), Some(target)) = (keys, entry.as_table_mut()) {
                for (key, value) in keys {
                    target.insert(key.clone(), toml::Value::try_from(value).unwrap());
                }
            }
        }
    }

    let path = dir.join(format!("{}.config.test.toml", name));
    fs::write(&path, toml::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

use serde::Deserialize;
use std::path::Path;

use crate::shared::datetime::TimeConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
    pub time: TimeConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run the map and finalize phases on a rayon pool
    pub parallel: bool,
    /// Worker count for the pool (None = rayon default)
    pub worker_threads: Option<usize>,
    /// Wall-clock budget for a whole run, in milliseconds
    pub deadline_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            worker_threads: None,
            deadline_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            stdout_level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}

/// Settings handed to the record store at construction time
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Reject appends once an entity holds this many events
    pub max_events_per_entity: Option<usize>,
    /// Lowercase event names and strip characters outside `[a-z0-9_]`
    pub normalize_event_names: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_events_per_entity: None,
            normalize_event_names: true,
        }
    }
}

pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).required(true))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}

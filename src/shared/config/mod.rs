pub mod model;

pub use model::{EngineConfig, LoggingConfig, Settings, StoreConfig, load_settings};

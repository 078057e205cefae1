use crate::command::types::RawSpec;
use crate::engine::errors::SpecError;
use tracing::{debug, warn};

/// Parses a raw spec from JSON text.
pub fn parse_json(input: &str) -> Result<RawSpec, SpecError> {
    debug!(target: "snel_cohort::parse", len = input.len(), "Parsing JSON spec");
    serde_json::from_str(input).map_err(|e| {
        warn!(target: "snel_cohort::parse", error = %e, "JSON spec rejected");
        SpecError::Parse(e.to_string())
    })
}

/// Parses a raw spec from TOML text.
pub fn parse_toml(input: &str) -> Result<RawSpec, SpecError> {
    debug!(target: "snel_cohort::parse", len = input.len(), "Parsing TOML spec");
    toml::from_str(input).map_err(|e| {
        warn!(target: "snel_cohort::parse", error = %e, "TOML spec rejected");
        SpecError::Parse(e.to_string())
    })
}

/// Picks the format from the first non-blank character: `{` means JSON.
pub fn parse_spec(input: &str) -> Result<RawSpec, SpecError> {
    if input.trim_start().starts_with('{') {
        parse_json(input)
    } else {
        parse_toml(input)
    }
}

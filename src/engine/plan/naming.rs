use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::engine::core::event::event::value_to_key;

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]+").unwrap());

/// Lowercases and collapses every run of characters outside `[a-z0-9_]` into `_`.
pub fn sanitize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    NON_IDENT
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Integral thresholds render without a fractional part (`2`, not `2.0`).
pub fn format_threshold(threshold: f64) -> String {
    if threshold.fract() == 0.0 && threshold.abs() < i64::MAX as f64 {
        format!("{}", threshold as i64)
    } else {
        sanitize(&threshold.to_string())
    }
}

/// Inputs to default-name derivation for a metric that omits `name`.
pub struct NameParts<'a> {
    pub targets: &'a [String],
    /// `Some((label, operand))` when a non-trivial condition prefixes the name
    pub condition: Option<(&'a str, String)>,
    pub attribute: Option<&'a str>,
    pub literal: Option<&'a Value>,
}

pub fn derive_name(parts: &NameParts<'_>) -> String {
    let mut name = parts.targets.join("_or_");

    if let Some((label, operand)) = &parts.condition {
        name = format!("has_{}_{}_{}", label, operand, name);
    }

    if let Some(attribute) = parts.attribute {
        name = format!("{}_{}", name, attribute);
    }

    if let Some(literal) = parts.literal {
        let suffix = sanitize(&value_to_key(literal));
        if !suffix.is_empty() {
            name = format!("{}_{}", name, suffix);
        }
    }

    name
}

pub fn derived_output_name(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}

pub fn bucket_metric_name(name: &str, label: &str) -> String {
    format!("{}_{}", name, label)
}

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    Include,
    NotInclude,
    IncludeAll,
    IncludeNone,
    Regex,
    /// JSON pointer into the rendered report
    Field,
    /// Number of elements of the array at `path`
    Len,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MatcherValue {
    Single(String),
    Multiple(Vec<String>),
    Json(Value),
}

#[derive(Debug, Deserialize)]
pub struct Matcher {
    pub kind: MatcherKind,
    #[serde(default)]
    pub path: Option<String>,
    pub value: MatcherValue,
}

fn close_enough(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) => (a - e).abs() < 1e-3,
        _ => actual == expected,
    }
}

impl Matcher {
    pub fn matches(&self, actual: &str) -> bool {
        let result = match (&self.kind, &self.value) {
            (MatcherKind::Include, MatcherValue::Single(s)) => actual.contains(s),
            (MatcherKind::NotInclude, MatcherValue::Single(s)) => !actual.contains(s),
            (MatcherKind::IncludeAll, MatcherValue::Multiple(all)) => {
                all.iter().all(|frag| actual.contains(frag))
            }
            (MatcherKind::IncludeNone, MatcherValue::Multiple(none)) => {
                none.iter().all(|frag| !actual.contains(frag))
            }
            (MatcherKind::Regex, MatcherValue::Single(pattern)) => match Regex::new(pattern) {
                Ok(re) => re.is_match(actual),
                Err(e) => {
                    error!("Invalid regex '{}': {}", pattern, e);
                    false
                }
            },
            (MatcherKind::Field, expected) => self.pointer(actual).is_some_and(|found| {
                let expected = match expected {
                    MatcherValue::Single(s) => Value::String(s.clone()),
                    MatcherValue::Json(v) => v.clone(),
                    MatcherValue::Multiple(v) => Value::from(v.clone()),
                };
                close_enough(&found, &expected)
            }),
            (MatcherKind::Len, MatcherValue::Json(expected)) => self
                .pointer(actual)
                .and_then(|found| found.as_array().map(|a| a.len() as u64))
                .is_some_and(|len| Some(len) == expected.as_u64()),
            _ => {
                error!("Invalid matcher kind/value combination: {:?}", self);
                false
            }
        };
        debug!("Matcher {:?} -> {}", self.kind, result);
        result
    }

    fn pointer(&self, actual: &str) -> Option<Value> {
        let doc: Value = serde_json::from_str(actual).ok()?;
        doc.pointer(self.path.as_deref().unwrap_or("")).cloned()
    }
}

use serde_json::Value;
use tracing::debug;

use crate::engine::core::Entity;
use crate::engine::core::event::event::literal_matches;
use crate::engine::errors::SpecError;

/// Field name that refers to the entity's event history in a filter.
pub const EVENTS_FIELD: &str = "events";

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Equals { field: String, value: Value },
    Exists { field: String, exists: bool },
}

impl FilterCondition {
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            FilterCondition::Equals { field, value } => match field.as_str() {
                "id" => literal_matches(&Value::String(entity.id.clone()), value),
                _ => entity
                    .attribute(field)
                    .is_some_and(|actual| literal_matches(actual, value)),
            },
            FilterCondition::Exists { field, exists } => {
                let present = match field.as_str() {
                    EVENTS_FIELD => !entity.events.is_empty(),
                    _ => entity.attribute(field).is_some(),
                };
                present == *exists
            }
        }
    }
}

/// Conjunction of conditions applied by the record store before execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub conditions: Vec<FilterCondition>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a filter from a query object such as
    /// `{"gender": "Male", "events": {"$exists": true}}`.
    pub fn from_query(query: Option<&Value>) -> Result<Self, SpecError> {
        let map = match query {
            None | Some(Value::Null) => return Ok(Self::all()),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(SpecError::InvalidFilter(format!(
                    "query must be an object, got {}",
                    other
                )));
            }
        };

        let mut conditions = Vec::with_capacity(map.len());
        for (field, value) in map {
            let condition = match value {
                Value::Object(ops) => Self::operator(field, ops)?,
                Value::Array(_) => {
                    return Err(SpecError::InvalidFilter(format!(
                        "field '{}' cannot be matched against a list",
                        field
                    )));
                }
                scalar => FilterCondition::Equals {
                    field: field.clone(),
                    value: scalar.clone(),
                },
            };
            conditions.push(condition);
        }

        debug!(target: "snel_cohort::store::filter", count = conditions.len(), "Compiled record filter");
        Ok(Self { conditions })
    }

    fn operator(
        field: &str,
        ops: &serde_json::Map<String, Value>,
    ) -> Result<FilterCondition, SpecError> {
        match ops.iter().next() {
            Some((op, Value::Bool(exists))) if op == "$exists" && ops.len() == 1 => {
                Ok(FilterCondition::Exists {
                    field: field.to_string(),
                    exists: *exists,
                })
            }
            _ => Err(SpecError::InvalidFilter(format!(
                "unsupported operator on '{}': {}",
                field,
                Value::Object(ops.clone())
            ))),
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.conditions.iter().all(|c| c.matches(entity))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

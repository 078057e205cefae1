use serde_json::Value;

use super::naming::sanitize;
use crate::engine::core::event::event::{literal_matches, value_as_f64};
use crate::engine::errors::SpecError;

/// One partition of a bucketed metric
#[derive(Debug, Clone, PartialEq)]
pub enum Bucket {
    /// Matches an attribute value equal to the literal
    Literal(String),
    Exact(i64),
    /// `min` and above
    From(i64),
    /// `min..=max`
    Range(i64, i64),
}

/// Raw per-unit value a bucket partition is evaluated against
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Number(f64),
    Text(Value),
}

impl Bucket {
    pub fn label(&self) -> String {
        match self {
            Bucket::Literal(s) => sanitize(s),
            Bucket::Exact(n) => n.to_string(),
            Bucket::From(min) => format!("{}_plus", min),
            Bucket::Range(min, max) => format!("{}_to_{}", min, max),
        }
    }

    pub fn contains(&self, observed: &Observation) -> bool {
        match (self, observed) {
            (Bucket::Literal(lit), Observation::Text(v)) => {
                literal_matches(v, &Value::String(lit.clone()))
            }
            (Bucket::Literal(lit), Observation::Number(n)) => lit
                .trim()
                .parse::<f64>()
                .map(|l| l == *n)
                .unwrap_or(false),
            (Bucket::Exact(x), Observation::Number(n)) => *n == *x as f64,
            (Bucket::From(min), Observation::Number(n)) => *n >= *min as f64,
            (Bucket::Range(min, max), Observation::Number(n)) => {
                *n >= *min as f64 && *n <= *max as f64
            }
            (_, Observation::Text(v)) => match value_as_f64(v) {
                Some(n) => self.contains(&Observation::Number(n)),
                None => false,
            },
        }
    }

    /// Accepted forms: `"literal"`, `3`, `[2, null]`, `[2]`, `[2, 5]`, `{"min": 2, "max": 5}`.
    pub fn parse(metric: &str, raw: &Value) -> Result<Self, SpecError> {
        let invalid = |reason: String| SpecError::InvalidBucket {
            metric: metric.to_string(),
            reason,
        };
        let bound = |v: &Value, what: &str| -> Result<i64, SpecError> {
            v.as_i64()
                .ok_or_else(|| invalid(format!("{} bound {} is not an integer", what, v)))
        };

        let (min, max) = match raw {
            Value::String(s) if !s.trim().is_empty() => return Ok(Bucket::Literal(s.clone())),
            Value::Number(_) => return Ok(Bucket::Exact(bound(raw, "exact")?)),
            Value::Array(items) => match items.as_slice() {
                [min] => (bound(min, "lower")?, None),
                [min, Value::Null] => (bound(min, "lower")?, None),
                [min, max] => (bound(min, "lower")?, Some(bound(max, "upper")?)),
                _ => return Err(invalid(format!("expected [min, max], got {}", raw))),
            },
            Value::Object(map) => {
                let min = map
                    .get("min")
                    .ok_or_else(|| invalid("missing 'min'".to_string()))?;
                let max = match map.get("max") {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(bound(v, "upper")?),
                };
                (bound(min, "lower")?, max)
            }
            other => return Err(invalid(format!("unsupported bucket {}", other))),
        };

        match max {
            None => Ok(Bucket::From(min)),
            Some(max) if min > max => Err(invalid(format!("min {} exceeds max {}", min, max))),
            Some(max) => Ok(Bucket::Range(min, max)),
        }
    }

    fn numeric_span(&self) -> Option<(i64, i64)> {
        match self {
            Bucket::Literal(_) => None,
            Bucket::Exact(x) => Some((*x, *x)),
            Bucket::From(min) => Some((*min, i64::MAX)),
            Bucket::Range(min, max) => Some((*min, *max)),
        }
    }

    /// Numeric reading of a literal bucket (`"5.0"` matches the number 5).
    fn literal_number(&self) -> Option<f64> {
        match self {
            Bucket::Literal(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn overlaps(&self, other: &Bucket) -> bool {
        match (self, other) {
            (Bucket::Literal(a), Bucket::Literal(b)) => {
                a == b
                    || matches!(
                        (self.literal_number(), other.literal_number()),
                        (Some(x), Some(y)) if x == y
                    )
            }
            (Bucket::Literal(_), _) => match (self.literal_number(), other.numeric_span()) {
                (Some(v), Some((lo, hi))) => v >= lo as f64 && v <= hi as f64,
                _ => false,
            },
            (_, Bucket::Literal(_)) => other.overlaps(self),
            _ => match (self.numeric_span(), other.numeric_span()) {
                (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => a_lo <= b_hi && b_lo <= a_hi,
                _ => false,
            },
        }
    }
}

/// Parses a bucket partition and rejects overlapping members, so that a raw
/// value selects at most one bucket.
pub fn parse_partition(metric: &str, raw: &Value) -> Result<Vec<Bucket>, SpecError> {
    let items = match raw {
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(SpecError::InvalidBucket {
                metric: metric.to_string(),
                reason: "bucket condition needs a non-empty list".to_string(),
            });
        }
    };

    let buckets = items
        .iter()
        .map(|item| Bucket::parse(metric, item))
        .collect::<Result<Vec<_>, _>>()?;

    for (i, a) in buckets.iter().enumerate() {
        for b in &buckets[i + 1..] {
            if a.overlaps(b) {
                return Err(SpecError::OverlappingBuckets {
                    metric: metric.to_string(),
                    first: a.label(),
                    second: b.label(),
                });
            }
        }
    }
    Ok(buckets)
}

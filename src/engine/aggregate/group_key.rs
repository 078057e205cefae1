use std::cmp::Ordering;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState as AHashRandomState;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use crate::engine::core::{Entity, Event};
use crate::engine::plan::{Dimension, DimensionSource, Granularity};
use crate::shared::datetime::CalendarTimeBucketer;
use crate::shared::time::TimeParser;

/// One resolved dimension value. Integers avoid string allocations; calendar
/// buckets keep their date so keys sort chronologically. Non-integral numbers
/// group by their decimal text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Date(NaiveDate),
}

impl GroupValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => GroupValue::Null,
            Value::String(s) => GroupValue::Str(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => GroupValue::Int(i),
                None => GroupValue::Str(n.to_string()),
            },
            Value::Bool(b) => GroupValue::Bool(*b),
            other => GroupValue::Str(other.to_string()),
        }
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Null => Ok(()),
            GroupValue::Bool(b) => write!(f, "{}", b),
            GroupValue::Int(i) => write!(f, "{}", i),
            GroupValue::Str(s) => f.write_str(s),
            GroupValue::Date(d) => write!(f, "{}", d.format("%Y/%m/%d")),
        }
    }
}

impl Serialize for GroupValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupValue::Null => serializer.serialize_none(),
            GroupValue::Bool(b) => serializer.serialize_bool(*b),
            GroupValue::Int(i) => serializer.serialize_i64(*i),
            GroupValue::Str(s) => serializer.serialize_str(s),
            GroupValue::Date(_) => serializer.collect_str(self),
        }
    }
}

/// Ordered tuple of dimension values identifying one aggregation bucket.
#[derive(Clone, Debug, Eq)]
pub struct GroupKey {
    // Cached hash; equality and ordering use `groups` only
    pub(crate) prehash: u64,
    pub(crate) groups: Vec<GroupValue>,
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.groups == other.groups
    }
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prehash.hash(state);
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.groups.cmp(&other.groups)
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.groups.serialize(serializer)
    }
}

impl GroupKey {
    pub fn new(groups: Vec<GroupValue>) -> Self {
        let prehash = Self::compute_prehash(&groups);
        Self { prehash, groups }
    }

    /// Key of an ungrouped report
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn groups(&self) -> &[GroupValue] {
        &self.groups
    }

    pub fn get(&self, index: usize) -> Option<&GroupValue> {
        self.groups.get(index)
    }

    #[inline]
    fn compute_prehash(groups: &[GroupValue]) -> u64 {
        let mut hasher = AHashRandomState::with_seeds(0, 0, 0, 0).build_hasher();
        for g in groups {
            g.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Maps an entity (and, for pivot units, its anchor event) to a `GroupKey`.
/// Identical inputs always produce identical keys.
pub struct KeyResolver<'a> {
    dimensions: &'a [Dimension],
    bucketer: &'a CalendarTimeBucketer,
}

impl<'a> KeyResolver<'a> {
    pub fn new(dimensions: &'a [Dimension], bucketer: &'a CalendarTimeBucketer) -> Self {
        Self {
            dimensions,
            bucketer,
        }
    }

    pub fn resolve(&self, entity: &Entity, anchor: Option<&Event>) -> GroupKey {
        let groups = self
            .dimensions
            .iter()
            .map(|dim| self.resolve_value(dim, entity, anchor))
            .collect();
        GroupKey::new(groups)
    }

    pub fn resolve_value(
        &self,
        dimension: &Dimension,
        entity: &Entity,
        anchor: Option<&Event>,
    ) -> GroupValue {
        if dimension.granularity == Granularity::AbVariant {
            return match entity.variant(&dimension.name) {
                Some(v) => GroupValue::Str(format!("variation_{}", v)),
                None => GroupValue::Null,
            };
        }

        let raw = match &dimension.source {
            DimensionSource::Attribute => entity.attribute(&dimension.name).cloned(),
            DimensionSource::Event { .. } => anchor.and_then(|e| e.get_field(&dimension.name)),
        };
        let Some(raw) = raw else {
            return GroupValue::Null;
        };

        match dimension.granularity.time_granularity() {
            None => GroupValue::from_json(&raw),
            Some(gran) => {
                let date = TimeParser::value_to_time(&raw)
                    .and_then(|time| self.bucketer.bucket_time(time, gran));
                match date {
                    Some(d) => GroupValue::Date(d),
                    None => {
                        trace!(
                            target: "snel_cohort::execute::resolve",
                            entity = %entity.id,
                            dimension = %dimension.name,
                            "Unparseable date; grouping under null"
                        );
                        GroupValue::Null
                    }
                }
            }
        }
    }

    /// Cohort start for retention: the calendar bucket of the dimension's date.
    pub fn bucket_start(&self, dimension: &Dimension, entity: &Entity) -> Option<NaiveDate> {
        match self.resolve_value(dimension, entity, None) {
            GroupValue::Date(d) => Some(d),
            _ => None,
        }
    }
}

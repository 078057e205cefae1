use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::bucket::Bucket;
use crate::engine::errors::SpecError;
use crate::engine::store::filter::RecordFilter;
use crate::shared::datetime::TimeGranularity;

/// Name of the implicit per-unit counter every funnel plan carries.
pub const COUNT_SLOT: &str = "count";

/// How a metric is finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CalcKind {
    #[serde(rename = "total")]
    Sum,
    #[serde(rename = "avg")]
    Average,
    #[serde(rename = "pct")]
    Percentage,
}

impl CalcKind {
    pub fn parse(raw: Option<&str>) -> Result<Self, SpecError> {
        match raw.map(str::trim) {
            None | Some("total") | Some("sum") => Ok(CalcKind::Sum),
            Some("avg") | Some("average") => Ok(CalcKind::Average),
            Some("pct") | Some("percentage") => Ok(CalcKind::Percentage),
            Some(other) => Err(SpecError::UnknownCalcKind(other.to_string())),
        }
    }

    /// Prefix of the derived output name; `None` for pass-through sums
    pub fn derived_prefix(&self) -> Option<&'static str> {
        match self {
            CalcKind::Sum => None,
            CalcKind::Average => Some("avg"),
            CalcKind::Percentage => Some("pct"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Value,
    Monthly,
    Weekly,
    AbVariant,
}

impl Granularity {
    pub fn parse(raw: Option<&str>) -> Result<Self, SpecError> {
        match raw.map(str::trim) {
            None | Some("value") | Some("raw") => Ok(Granularity::Value),
            Some("monthly") | Some("month") => Ok(Granularity::Monthly),
            Some("weekly") | Some("week") => Ok(Granularity::Weekly),
            Some("ab") | Some("ab_variant") | Some("ab-variant") => Ok(Granularity::AbVariant),
            Some(other) => Err(SpecError::UnknownGranularity(other.to_string())),
        }
    }

    pub fn time_granularity(&self) -> Option<TimeGranularity> {
        match self {
            Granularity::Monthly => Some(TimeGranularity::Month),
            Granularity::Weekly => Some(TimeGranularity::Week),
            Granularity::Value | Granularity::AbVariant => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DimensionSource {
    /// Entity attribute (or AB assignment)
    Attribute,
    /// Attribute of the earliest anchor event of a pivot unit
    Event { anchors: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub source: DimensionSource,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    AtLeast,
    AtMost,
    Exactly,
}

impl Comparator {
    pub fn label(&self) -> &'static str {
        match self {
            Comparator::AtLeast => "at_least",
            Comparator::AtMost => "at_most",
            Comparator::Exactly => "exactly",
        }
    }

    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::AtLeast => value >= threshold,
            Comparator::AtMost => value <= threshold,
            Comparator::Exactly => value == threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketSlot {
    pub bucket: Bucket,
    pub name: String,
    pub slot: usize,
}

/// Post-scan adjustment applied to a metric's raw value
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Raw value kept as is
    Sum,
    /// Raw value replaced by a 0/1 indicator
    Threshold { comparator: Comparator, threshold: f64 },
    /// The bucket containing the raw value gets a 1
    Buckets(Vec<BucketSlot>),
    /// Value zeroed unless the companion slot is nonzero
    DependsOn { companion: String, slot: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Count,
    SumAttribute(String),
    MatchValue { attribute: String, literal: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricSource {
    Events {
        names: Vec<String>,
        extraction: Extraction,
    },
    Attribute {
        attribute: String,
        literal: Option<Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub name: String,
    pub kind: CalcKind,
    pub source: MetricSource,
    pub condition: Condition,
    /// Accumulator slot of the raw value; `None` for attribute buckets read directly
    pub slot: Option<usize>,
    /// Slot used as denominator by derived outputs
    pub denominator: usize,
}

/// One accumulator slot in a partial aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSpec {
    pub name: String,
    pub kind: CalcKind,
}

/// Ratio computed by the finalizer
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetric {
    pub name: String,
    pub kind: CalcKind,
    pub numerator: usize,
    pub denominator: usize,
}

/// Name and calculation kind of one output column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMeta {
    pub name: String,
    pub kind: CalcKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotSpec {
    pub field: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelPlan {
    pub filter: RecordFilter,
    pub dimensions: Vec<Dimension>,
    pub slots: Vec<SlotSpec>,
    pub metrics: Vec<MetricSpec>,
    pub derived: Vec<DerivedMetric>,
    pub pivot: Option<PivotSpec>,
    pub(crate) event_index: HashMap<String, Vec<usize>>,
}

impl FunnelPlan {
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Metric indices whose target set contains `event`
    pub fn metrics_for_event(&self, event: &str) -> &[usize] {
        self.event_index
            .get(event)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Raw slots first (reported as totals), then derived ratios
    pub fn metric_meta(&self) -> Vec<MetricMeta> {
        self.slots
            .iter()
            .map(|s| MetricMeta {
                name: s.name.clone(),
                kind: CalcKind::Sum,
            })
            .chain(self.derived.iter().map(|d| MetricMeta {
                name: d.name.clone(),
                kind: d.kind,
            }))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPlan {
    pub filter: RecordFilter,
    pub dimensions: Vec<Dimension>,
    /// Index of the dimension that defines each entity's cohort
    pub cohort: usize,
    pub interval: TimeGranularity,
    pub action: String,
    pub periods: Option<u32>,
}

/// A normalized spec, ready for execution
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledSpec {
    Funnel(FunnelPlan),
    Retention(RetentionPlan),
}

impl CompiledSpec {
    pub fn filter(&self) -> &RecordFilter {
        match self {
            CompiledSpec::Funnel(p) => &p.filter,
            CompiledSpec::Retention(p) => &p.filter,
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        match self {
            CompiledSpec::Funnel(p) => &p.dimensions,
            CompiledSpec::Retention(p) => &p.dimensions,
        }
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions().iter().map(|d| d.name.clone()).collect()
    }
}

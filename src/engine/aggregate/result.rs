use indexmap::IndexMap;
use serde::Serialize;

use super::group_key::GroupKey;
use crate::engine::plan::{CalcKind, MetricMeta};
use crate::engine::stats::ExecutionStats;

/// A finalized metric. Raw slots report `value == numerator` over a
/// denominator of 1; ratios keep both operands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricValue {
    pub kind: CalcKind,
    pub value: f64,
    pub numerator: f64,
    pub denominator: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRow {
    pub key: GroupKey,
    pub metrics: IndexMap<String, MetricValue>,
}

impl FinalRow {
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|m| m.value)
    }
}

/// Funnel report: one row per group key, sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    pub dimensions: Vec<String>,
    pub metrics: Vec<MetricMeta>,
    pub rows: Vec<FinalRow>,
    pub stats: ExecutionStats,
}

impl FinalResult {
    pub fn get(&self, key: &GroupKey) -> Option<&FinalRow> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

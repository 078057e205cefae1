use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use super::partial::RetentionPartial;
use crate::engine::aggregate::GroupKey;
use crate::engine::aggregate::finalization::ratio;
use crate::engine::plan::RetentionPlan;
use crate::engine::stats::ExecutionStats;
use crate::shared::datetime::TimeGranularity;
use crate::shared::datetime::time_bucketing::{interval_offset, shift_interval};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalValue {
    pub offset: u32,
    #[serde(serialize_with = "serialize_date")]
    pub start: NaiveDate,
    pub count: u64,
    /// Fraction of the cohort active in this interval
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    pub key: GroupKey,
    #[serde(serialize_with = "serialize_date")]
    pub cohort_start: NaiveDate,
    pub size: u64,
    pub intervals: Vec<IntervalValue>,
}

impl CohortRow {
    pub fn rate(&self, offset: u32) -> Option<f64> {
        self.intervals.get(offset as usize).map(|i| i.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionResult {
    pub dimensions: Vec<String>,
    pub interval: TimeGranularity,
    pub cohorts: Vec<CohortRow>,
    pub stats: ExecutionStats,
}

impl RetentionResult {
    pub fn get(&self, key: &GroupKey) -> Option<&CohortRow> {
        self.cohorts.iter().find(|c| &c.key == key)
    }
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format("%Y/%m/%d"))
}

/// Dense interval list from 0 through the later of the last observed interval
/// and `periods - 1`; gaps are zero-filled.
pub fn finalize_cohort(
    key: GroupKey,
    partial: &RetentionPartial,
    interval: TimeGranularity,
    periods: Option<u32>,
) -> CohortRow {
    let observed_last = partial
        .counts
        .keys()
        .next_back()
        .and_then(|last| interval_offset(partial.cohort_start, *last, interval))
        .unwrap_or(0);
    let last = observed_last.max(periods.unwrap_or(0).saturating_sub(1));

    let size = partial.size as f64;
    let mut intervals = Vec::with_capacity(last as usize + 1);
    for offset in 0..=last {
        let Some(start) = shift_interval(partial.cohort_start, interval, offset) else {
            warn!(target: "snel_cohort::retention", offset, "Interval out of calendar range; truncating");
            break;
        };
        let count = if offset == 0 {
            partial.size
        } else {
            partial.counts.get(&start).copied().unwrap_or(0)
        };
        intervals.push(IntervalValue {
            offset,
            start,
            count,
            value: ratio(count as f64, size),
        });
    }

    CohortRow {
        key,
        cohort_start: partial.cohort_start,
        size: partial.size,
        intervals,
    }
}

pub fn into_result(
    plan: &RetentionPlan,
    groups: Vec<(GroupKey, RetentionPartial)>,
    stats: ExecutionStats,
) -> RetentionResult {
    let cohorts = groups
        .into_par_iter()
        .map(|(key, partial)| finalize_cohort(key, &partial, plan.interval, plan.periods))
        .collect();

    RetentionResult {
        dimensions: plan.dimensions.iter().map(|d| d.name.clone()).collect(),
        interval: plan.interval,
        cohorts,
        stats,
    }
}

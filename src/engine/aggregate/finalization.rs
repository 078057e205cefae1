use indexmap::IndexMap;
use rayon::prelude::*;

use super::group_key::GroupKey;
use super::partial::PartialAggregate;
use super::result::{FinalResult, FinalRow, MetricValue};
use crate::engine::errors::ExecutionError;
use crate::engine::plan::{CalcKind, FunnelPlan};
use crate::engine::stats::ExecutionStats;

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Pure function of the merged partial: raw slots first, then derived ratios.
/// A partial narrower or wider than the plan is rejected, never zero-filled.
pub fn finalize_group(
    plan: &FunnelPlan,
    partial: &PartialAggregate,
) -> Result<IndexMap<String, MetricValue>, ExecutionError> {
    if partial.width() != plan.slots.len() {
        return Err(ExecutionError::PartialShapeMismatch {
            expected: plan.slots.len(),
            actual: partial.width(),
        });
    }
    let slot = |i: usize| {
        partial
            .get(i)
            .ok_or(ExecutionError::PartialShapeMismatch {
                expected: i + 1,
                actual: partial.width(),
            })
    };

    let mut out = IndexMap::with_capacity(plan.slots.len() + plan.derived.len());
    for (i, spec) in plan.slots.iter().enumerate() {
        let value = slot(i)?;
        out.insert(
            spec.name.clone(),
            MetricValue {
                kind: CalcKind::Sum,
                value,
                numerator: value,
                denominator: 1.0,
            },
        );
    }
    for derived in &plan.derived {
        let numerator = slot(derived.numerator)?;
        let denominator = slot(derived.denominator)?;
        out.insert(
            derived.name.clone(),
            MetricValue {
                kind: derived.kind,
                value: ratio(numerator, denominator),
                numerator,
                denominator,
            },
        );
    }
    Ok(out)
}

/// Converts merged groups into a report. An ungrouped plan always yields one
/// row, zeroed when nothing matched.
pub fn into_result(
    plan: &FunnelPlan,
    groups: Vec<(GroupKey, PartialAggregate)>,
    stats: ExecutionStats,
) -> Result<FinalResult, ExecutionError> {
    let groups = if groups.is_empty() && plan.dimensions.is_empty() {
        vec![(GroupKey::empty(), PartialAggregate::zeroed(plan.slots.len()))]
    } else {
        groups
    };

    let rows = groups
        .into_par_iter()
        .map(|(key, partial)| -> Result<FinalRow, ExecutionError> {
            Ok(FinalRow {
                metrics: finalize_group(plan, &partial)?,
                key,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FinalResult {
        dimensions: plan.dimensions.iter().map(|d| d.name.clone()).collect(),
        metrics: plan.metric_meta(),
        rows,
        stats,
    })
}

use std::collections::BTreeMap;

use tracing::trace;

use super::partial::PartialAggregate;
use crate::engine::core::event::event::{literal_matches, value_as_f64, value_to_key};
use crate::engine::core::{Entity, Event};
use crate::engine::errors::{EntitySkip, SkipReason};
use crate::engine::plan::types::{BucketSlot, DimensionSource, FunnelPlan, PivotSpec};
use crate::engine::plan::{Condition, Extraction, MetricSource, MetricSpec, Observation};

/// The events one partial aggregate is built from: a whole entity, or one
/// pivot partition together with its anchor event.
#[derive(Debug)]
pub struct Unit<'a> {
    pub anchor: Option<&'a Event>,
    pub events: Vec<&'a Event>,
}

/// Builds per-unit partial aggregates for a funnel plan.
pub struct MetricAccumulator<'a> {
    plan: &'a FunnelPlan,
}

impl<'a> MetricAccumulator<'a> {
    pub fn new(plan: &'a FunnelPlan) -> Self {
        Self { plan }
    }

    /// Splits an entity into the units it contributes.
    pub fn units<'e>(&self, entity: &'e Entity, skips: &mut Vec<EntitySkip>) -> Vec<Unit<'e>> {
        match &self.plan.pivot {
            None => vec![Unit {
                anchor: None,
                events: entity.events_chronological(),
            }],
            Some(pivot) => self.pivot_units(pivot, entity, skips),
        }
    }

    fn anchors(&self) -> &[String] {
        self.plan
            .dimensions
            .iter()
            .find_map(|d| match &d.source {
                DimensionSource::Event { anchors } => Some(anchors.as_slice()),
                DimensionSource::Attribute => None,
            })
            .unwrap_or(&[])
    }

    fn pivot_units<'e>(
        &self,
        pivot: &PivotSpec,
        entity: &'e Entity,
        skips: &mut Vec<EntitySkip>,
    ) -> Vec<Unit<'e>> {
        let anchors = self.anchors();
        let relevant = |name: &str| {
            !self.plan.metrics_for_event(name).is_empty()
                || anchors.iter().any(|a| a == name)
                || pivot.actions.iter().any(|a| a == name)
        };

        let mut partitions: BTreeMap<String, Vec<&'e Event>> = BTreeMap::new();
        for event in entity.events_chronological() {
            if !relevant(&event.name) {
                continue;
            }
            match event.get_field(&pivot.field) {
                Some(value) => partitions.entry(value_to_key(&value)).or_default().push(event),
                None => {
                    trace!(
                        target: "snel_cohort::execute::accumulate",
                        entity = %entity.id,
                        event = %event.name,
                        "Event lacks pivot attribute"
                    );
                    skips.push(EntitySkip {
                        metric: pivot.field.clone(),
                        reason: SkipReason::MissingPivot,
                    });
                }
            }
        }

        partitions
            .into_values()
            .filter_map(|events| {
                let anchor = events
                    .iter()
                    .copied()
                    .find(|e| anchors.iter().any(|a| *a == e.name))?;
                Some(Unit {
                    anchor: Some(anchor),
                    events,
                })
            })
            .collect()
    }

    /// Scans a unit's events once, then applies conditional adjustments.
    pub fn accumulate(
        &self,
        entity: &Entity,
        unit: &Unit<'_>,
        skips: &mut Vec<EntitySkip>,
    ) -> PartialAggregate {
        let mut values = vec![0.0; self.plan.slots.len()];
        values[0] = 1.0;

        for metric in &self.plan.metrics {
            if let (
                MetricSource::Attribute {
                    attribute,
                    literal: Some(literal),
                },
                Some(slot),
            ) = (&metric.source, metric.slot)
            {
                if entity
                    .attribute(attribute)
                    .is_some_and(|v| literal_matches(v, literal))
                {
                    values[slot] += 1.0;
                }
            }
        }

        for event in &unit.events {
            for &idx in self.plan.metrics_for_event(&event.name) {
                let metric = &self.plan.metrics[idx];
                if let Some(slot) = metric.slot {
                    values[slot] += self.extract(metric, event, skips);
                }
            }
        }

        self.adjust(entity, &mut values, skips);
        PartialAggregate::from_values(values)
    }

    fn extract(&self, metric: &MetricSpec, event: &Event, skips: &mut Vec<EntitySkip>) -> f64 {
        let MetricSource::Events { extraction, .. } = &metric.source else {
            return 0.0;
        };
        match extraction {
            Extraction::Count => 1.0,
            Extraction::SumAttribute(attribute) => match event.get_field(attribute) {
                None => {
                    skips.push(EntitySkip {
                        metric: metric.name.clone(),
                        reason: SkipReason::MissingAttribute,
                    });
                    0.0
                }
                Some(value) => match value_as_f64(&value) {
                    Some(n) => n,
                    None => {
                        skips.push(EntitySkip {
                            metric: metric.name.clone(),
                            reason: SkipReason::NonNumericAttribute,
                        });
                        0.0
                    }
                },
            },
            Extraction::MatchValue { attribute, literal } => match event.get_field(attribute) {
                Some(value) if literal_matches(&value, literal) => 1.0,
                _ => 0.0,
            },
        }
    }

    /// Thresholds first, then bucket indicators, then dependent-if gating.
    fn adjust(&self, entity: &Entity, values: &mut [f64], skips: &mut Vec<EntitySkip>) {
        for metric in &self.plan.metrics {
            if let (
                Condition::Threshold {
                    comparator,
                    threshold,
                },
                Some(slot),
            ) = (&metric.condition, metric.slot)
            {
                values[slot] = if comparator.holds(values[slot], *threshold) {
                    1.0
                } else {
                    0.0
                };
            }
        }

        for metric in &self.plan.metrics {
            if let Condition::Buckets(buckets) = &metric.condition {
                let observed = match (&metric.source, metric.slot) {
                    (MetricSource::Attribute { attribute, .. }, _) => {
                        match entity.attribute(attribute) {
                            Some(v) => Observation::Text(v.clone()),
                            None => {
                                skips.push(EntitySkip {
                                    metric: metric.name.clone(),
                                    reason: SkipReason::MissingAttribute,
                                });
                                continue;
                            }
                        }
                    }
                    (_, Some(slot)) => Observation::Number(values[slot]),
                    (_, None) => continue,
                };
                mark_bucket(buckets, &observed, values);
            }
        }

        for metric in &self.plan.metrics {
            if let (Condition::DependsOn { slot: companion, .. }, Some(slot)) =
                (&metric.condition, metric.slot)
            {
                if values[*companion] == 0.0 {
                    values[slot] = 0.0;
                }
            }
        }
    }
}

fn mark_bucket(buckets: &[BucketSlot], observed: &Observation, values: &mut [f64]) {
    if let Some(hit) = buckets.iter().find(|b| b.bucket.contains(observed)) {
        values[hit.slot] = 1.0;
    }
}


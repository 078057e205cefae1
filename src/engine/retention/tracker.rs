use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::trace;

use super::partial::RetentionPartial;
use crate::engine::aggregate::KeyResolver;
use crate::engine::core::Entity;
use crate::engine::plan::RetentionPlan;
use crate::shared::datetime::CalendarTimeBucketer;

/// Assigns an entity to its cohort and records the distinct intervals in
/// which it performed the milestone action.
pub struct RetentionTracker<'a> {
    plan: &'a RetentionPlan,
    resolver: KeyResolver<'a>,
    bucketer: &'a CalendarTimeBucketer,
}

impl<'a> RetentionTracker<'a> {
    pub fn new(plan: &'a RetentionPlan, bucketer: &'a CalendarTimeBucketer) -> Self {
        Self {
            plan,
            resolver: KeyResolver::new(&plan.dimensions, bucketer),
            bucketer,
        }
    }

    pub fn resolver(&self) -> &KeyResolver<'a> {
        &self.resolver
    }

    /// `None` when the cohort date is missing or unparseable.
    pub fn track(&self, entity: &Entity) -> Option<RetentionPartial> {
        let cohort_dim = &self.plan.dimensions[self.plan.cohort];
        let Some(start) = self.resolver.bucket_start(cohort_dim, entity) else {
            trace!(
                target: "snel_cohort::retention",
                entity = %entity.id,
                dimension = %cohort_dim.name,
                "No cohort date; entity skipped"
            );
            return None;
        };

        let intervals: BTreeSet<NaiveDate> = entity
            .events
            .iter()
            .filter(|e| e.name == self.plan.action)
            .filter_map(|e| self.bucketer.bucket_date(e.timestamp, self.plan.interval))
            .filter(|d| *d > start)
            .collect();

        Some(RetentionPartial::for_entity(start, intervals))
    }
}

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::engine::aggregate::Mergeable;
use crate::engine::errors::ExecutionError;

/// Cohort size plus, per later interval, how many members were active in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetentionPartial {
    pub cohort_start: NaiveDate,
    pub size: u64,
    pub counts: BTreeMap<NaiveDate, u64>,
}

impl RetentionPartial {
    /// One entity: interval 0 is implicit, every later active interval counts once.
    pub fn for_entity(cohort_start: NaiveDate, intervals: BTreeSet<NaiveDate>) -> Self {
        Self {
            cohort_start,
            size: 1,
            counts: intervals.into_iter().map(|d| (d, 1)).collect(),
        }
    }
}

impl Mergeable for RetentionPartial {
    fn merge(&mut self, other: &RetentionPartial) -> Result<(), ExecutionError> {
        if self.cohort_start != other.cohort_start {
            return Err(ExecutionError::CohortMismatch {
                expected: self.cohort_start.to_string(),
                actual: other.cohort_start.to_string(),
            });
        }
        self.size += other.size;
        for (date, count) in &other.counts {
            *self.counts.entry(*date).or_insert(0) += count;
        }
        Ok(())
    }
}

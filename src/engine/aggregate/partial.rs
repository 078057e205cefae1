use serde::Serialize;
use tracing::error;

use crate::engine::errors::ExecutionError;

/// Associative merge of two partial results for the same group key.
pub trait Mergeable: Send + Sync {
    fn merge(&mut self, other: &Self) -> Result<(), ExecutionError>;
}

/// One unit's contribution to a group, one accumulator per slot of the plan.
///
/// Merging is element-wise addition, so it is associative and commutative.
/// Accumulators hold counts, sums of attributes and 0/1 indicators; while
/// these stay integral (below 2^53) floating point addition is exact and the
/// merge order cannot change the result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PartialAggregate {
    values: Vec<f64>,
}

impl PartialAggregate {
    pub fn zeroed(width: usize) -> Self {
        Self {
            values: vec![0.0; width],
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `None` for a slot outside this partial's width.
    pub fn get(&self, slot: usize) -> Option<f64> {
        self.values.get(slot).copied()
    }
}

impl Mergeable for PartialAggregate {
    fn merge(&mut self, other: &PartialAggregate) -> Result<(), ExecutionError> {
        if self.values.len() != other.values.len() {
            error!(
                target: "snel_cohort::merge",
                expected = self.values.len(),
                actual = other.values.len(),
                "Refusing to merge partials of different shapes"
            );
            return Err(ExecutionError::PartialShapeMismatch {
                expected: self.values.len(),
                actual: other.values.len(),
            });
        }
        for (a, b) in self.values.iter_mut().zip(other.values.iter()) {
            *a += *b;
        }
        Ok(())
    }
}

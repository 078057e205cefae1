use thiserror::Error;
use tracing::{debug, error};

/// Errors raised while normalizing an aggregation spec. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("Missing required field '{field}' in {context}")]
    MissingField { context: String, field: String },

    #[error("Unknown granularity '{0}'")]
    UnknownGranularity(String),

    #[error("Unknown report kind '{0}'")]
    UnknownReport(String),

    #[error("Unknown dimension type '{0}'")]
    UnknownDimensionType(String),

    #[error("Unknown metric type '{0}'")]
    UnknownMetricType(String),

    #[error("Unknown calculation kind '{0}'")]
    UnknownCalcKind(String),

    #[error("Unknown comparator '{0}'")]
    UnknownComparator(String),

    #[error("Invalid metric '{metric}': {reason}")]
    InvalidMetric { metric: String, reason: String },

    #[error("Invalid threshold for metric '{metric}': {reason}")]
    InvalidThreshold { metric: String, reason: String },

    #[error("Invalid bucket for metric '{metric}': {reason}")]
    InvalidBucket { metric: String, reason: String },

    #[error("Buckets {first} and {second} of metric '{metric}' overlap")]
    OverlappingBuckets {
        metric: String,
        first: String,
        second: String,
    },

    #[error("Duplicate metric name '{0}'")]
    DuplicateMetric(String),

    #[error("Metric '{metric}' references unknown metric '{reference}'")]
    UnknownMetricReference { metric: String, reference: String },

    #[error("Retention requires a monthly or weekly dimension")]
    MissingCohortDimension,

    #[error("Invalid record filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid pivot: {0}")]
    InvalidPivot(String),

    #[error("Spec parse error: {0}")]
    Parse(String),
}

impl SpecError {
    pub fn missing(context: impl Into<String>, field: impl Into<String>) -> Self {
        SpecError::MissingField {
            context: context.into(),
            field: field.into(),
        }
    }
}

/// Errors that can occur while executing a compiled spec.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Partial aggregate shape mismatch: expected {expected} slots, got {actual}")]
    PartialShapeMismatch { expected: usize, actual: usize },

    #[error("Cannot merge cohort starting {actual} into cohort starting {expected}")]
    CohortMismatch { expected: String, actual: String },

    #[error("Run exceeded its deadline of {0} ms")]
    DeadlineExceeded(u64),

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ExecutionError {
    pub fn log_error(&self) {
        match self {
            ExecutionError::Spec(e) => {
                error!("Spec rejected: {}", e);
                debug!("Spec error details: {:?}", e);
            }
            ExecutionError::PartialShapeMismatch { expected, actual } => {
                error!("Partial aggregate shape mismatch");
                debug!("Expected {} slots, got {}", expected, actual);
            }
            ExecutionError::CohortMismatch { expected, actual } => {
                error!("Retention partials disagree on cohort start");
                debug!("Expected {}, got {}", expected, actual);
            }
            ExecutionError::DeadlineExceeded(ms) => {
                error!("Run exceeded its deadline");
                debug!("Deadline was {} ms", ms);
            }
            ExecutionError::Cancelled => {
                error!("Run was cancelled");
                debug!("Cancellation flag observed; partial results discarded");
            }
            ExecutionError::ThreadPool(e) => {
                error!("Thread pool error: {}", e);
                debug!("Thread pool error details: {}", e);
            }
            ExecutionError::Store(e) => {
                error!("Store error: {}", e);
                debug!("Store error details: {:?}", e);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid entity id")]
    InvalidEntityId,

    #[error("Entity '{0}' already exists")]
    DuplicateEntity(String),

    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Entity '{id}' reached its event limit of {limit}")]
    EventLimitExceeded { id: String, limit: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Soft failure: one event could not feed one metric. Never aborts the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySkip {
    pub metric: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingAttribute,
    NonNumericAttribute,
    MissingPivot,
    UnparseableDate,
}

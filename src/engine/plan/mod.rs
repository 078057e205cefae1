pub mod bucket;
pub mod naming;
pub mod normalizer;
pub mod types;

pub use bucket::{Bucket, Observation};
pub use normalizer::compile;
pub use types::{
    CalcKind, Comparator, CompiledSpec, Condition, Dimension, DimensionSource, Extraction,
    FunnelPlan, Granularity, MetricMeta, MetricSource, MetricSpec, RetentionPlan,
};

pub mod accumulator;
pub mod finalization;
pub mod group_key;
pub mod partial;
pub mod result;
pub mod sink;

pub use accumulator::{MetricAccumulator, Unit};
pub use group_key::{GroupKey, GroupValue, KeyResolver};
pub use partial::{Mergeable, PartialAggregate};
pub use result::{FinalResult, FinalRow, MetricValue};
pub use sink::AggregateSink;

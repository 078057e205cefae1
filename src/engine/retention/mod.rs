pub mod finalization;
pub mod partial;
pub mod tracker;

pub use finalization::{CohortRow, IntervalValue, RetentionResult};
pub use partial::RetentionPartial;
pub use tracker::RetentionTracker;

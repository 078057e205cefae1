pub mod aggregate;
pub mod core;
pub mod errors;
pub mod executor;
pub mod pipeline;
pub mod plan;
pub mod retention;
pub mod stats;
pub mod store;

pub use errors::*;
pub use executor::{Executor, Report, compile, execute};
pub use pipeline::ReportPipeline;

pub mod filter;
pub mod memory;

pub use filter::{FilterCondition, RecordFilter};
pub use memory::InMemoryStore;

use crate::engine::core::Entity;
use crate::engine::errors::StoreError;
use crate::engine::executor::Report;

/// Source of entities and sink for finished reports.
pub trait RecordStore: Send + Sync {
    fn scan(&self, filter: &RecordFilter) -> Result<Vec<Entity>, StoreError>;

    fn write_report(&self, collection: &str, report: &Report) -> Result<(), StoreError>;
}

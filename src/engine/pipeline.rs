use std::sync::Arc;

use tracing::info;

use crate::command::types::RawSpec;
use crate::engine::errors::ExecutionError;
use crate::engine::executor::{Executor, Report};
use crate::engine::plan::compile;
use crate::engine::store::RecordStore;

/// compile → scan → execute → write. The spec is validated before the store
/// is touched, and nothing is written unless the whole run succeeds.
pub struct ReportPipeline<S: RecordStore> {
    store: Arc<S>,
    executor: Executor,
}

impl<S: RecordStore> ReportPipeline<S> {
    pub fn new(store: Arc<S>, executor: Executor) -> Self {
        Self { store, executor }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn run(&self, collection: &str, raw: &RawSpec) -> Result<Report, ExecutionError> {
        let spec = compile(raw).map_err(|e| {
            let err = ExecutionError::from(e);
            err.log_error();
            err
        })?;
        let entities = self.store.scan(spec.filter())?;
        info!(
            target: "snel_cohort::pipeline",
            collection,
            entities = entities.len(),
            "Running report"
        );

        let report = self.executor.execute(&spec, &entities)?;
        self.store.write_report(collection, &report)?;
        Ok(report)
    }
}

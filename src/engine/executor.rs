use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::command::types::RawSpec;
use crate::engine::aggregate::{
    AggregateSink, FinalResult, KeyResolver, MetricAccumulator, PartialAggregate, finalization,
};
use crate::engine::core::Entity;
use crate::engine::errors::ExecutionError;
use crate::engine::plan::{self, CompiledSpec, FunnelPlan, RetentionPlan};
use crate::engine::retention::finalization as retention_finalization;
use crate::engine::retention::{RetentionPartial, RetentionResult, RetentionTracker};
use crate::engine::stats::StatsCollector;
use crate::shared::config::{EngineConfig, Settings};
use crate::shared::datetime::CalendarTimeBucketer;

/// Output of one run, handed to the formatting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "report", rename_all = "lowercase")]
pub enum Report {
    Funnel(FinalResult),
    Retention(RetentionResult),
}

impl Report {
    pub fn as_funnel(&self) -> Option<&FinalResult> {
        match self {
            Report::Funnel(r) => Some(r),
            Report::Retention(_) => None,
        }
    }

    pub fn as_retention(&self) -> Option<&RetentionResult> {
        match self {
            Report::Retention(r) => Some(r),
            Report::Funnel(_) => None,
        }
    }
}

/// Deadline and cancellation checks shared by every worker of a run.
struct RunGuard<'a> {
    started: Instant,
    deadline: Option<Duration>,
    cancel: Option<&'a AtomicBool>,
}

impl RunGuard<'_> {
    fn check(&self) -> Result<(), ExecutionError> {
        if self.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            return Err(ExecutionError::Cancelled);
        }
        match self.deadline {
            Some(limit) if self.started.elapsed() >= limit => {
                Err(ExecutionError::DeadlineExceeded(limit.as_millis() as u64))
            }
            _ => Ok(()),
        }
    }
}

/// Runs compiled specs over entity snapshots: parallel map into a concurrent
/// per-key sink, then parallel finalization. All-or-nothing: any error
/// discards the partial results.
pub struct Executor {
    config: EngineConfig,
    bucketer: CalendarTimeBucketer,
    pool: Option<rayon::ThreadPool>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Executor {
    pub fn new(settings: &Settings) -> Result<Self, ExecutionError> {
        let config = settings.engine.clone();
        let threads = if config.parallel {
            config.worker_threads
        } else {
            Some(1)
        };
        let pool = match threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n.max(1))
                    .thread_name(|i| format!("cohort-worker-{}", i))
                    .build()
                    .map_err(|e| ExecutionError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        debug!(
            target: "snel_cohort::execute",
            parallel = config.parallel,
            threads = ?threads,
            deadline_ms = ?config.deadline_ms,
            "Executor ready"
        );
        Ok(Self {
            config,
            bucketer: CalendarTimeBucketer::new(settings.time.clone()),
            pool,
            cancel: None,
        })
    }

    /// Attaches a flag that aborts the run once set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn execute(&self, spec: &CompiledSpec, entities: &[Entity]) -> Result<Report, ExecutionError> {
        let guard = RunGuard {
            started: Instant::now(),
            deadline: self.config.deadline_ms.map(Duration::from_millis),
            cancel: self.cancel.as_deref(),
        };

        let run = || match spec {
            CompiledSpec::Funnel(plan) => self.run_funnel(plan, entities, &guard).map(Report::Funnel),
            CompiledSpec::Retention(plan) => self
                .run_retention(plan, entities, &guard)
                .map(Report::Retention),
        };
        let result = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        match &result {
            Ok(report) => {
                let stats = match report {
                    Report::Funnel(r) => r.stats,
                    Report::Retention(r) => r.stats,
                };
                info!(
                    target: "snel_cohort::execute",
                    entities = stats.entities,
                    units = stats.units,
                    groups = stats.groups,
                    skipped = stats.skipped,
                    elapsed_ms = guard.started.elapsed().as_millis() as u64,
                    "Run complete"
                );
            }
            Err(e) => e.log_error(),
        }
        result
    }

    fn run_funnel(
        &self,
        plan: &FunnelPlan,
        entities: &[Entity],
        guard: &RunGuard<'_>,
    ) -> Result<FinalResult, ExecutionError> {
        let accumulator = MetricAccumulator::new(plan);
        let resolver = KeyResolver::new(&plan.dimensions, &self.bucketer);
        let sink: AggregateSink<PartialAggregate> = AggregateSink::new();
        let stats = StatsCollector::default();

        entities.par_iter().try_for_each(|entity| {
            guard.check()?;
            let mut skips = Vec::new();
            let units = accumulator.units(entity, &mut skips);
            for unit in &units {
                let key = resolver.resolve(entity, unit.anchor);
                let partial = accumulator.accumulate(entity, unit, &mut skips);
                sink.merge(key, partial)?;
            }
            if !skips.is_empty() {
                trace!(target: "snel_cohort::execute", entity = %entity.id, skips = ?skips, "Soft skips");
            }
            stats.record_entity(units.len(), skips.len());
            Ok::<(), ExecutionError>(())
        })?;
        guard.check()?;

        let groups = sink.into_sorted();
        let mut result = finalization::into_result(plan, groups, stats.snapshot(0))?;
        result.stats.groups = result.rows.len() as u64;
        Ok(result)
    }

    fn run_retention(
        &self,
        plan: &RetentionPlan,
        entities: &[Entity],
        guard: &RunGuard<'_>,
    ) -> Result<RetentionResult, ExecutionError> {
        let tracker = RetentionTracker::new(plan, &self.bucketer);
        let sink: AggregateSink<RetentionPartial> = AggregateSink::new();
        let stats = StatsCollector::default();

        entities.par_iter().try_for_each(|entity| {
            guard.check()?;
            match tracker.track(entity) {
                Some(partial) => {
                    let key = tracker.resolver().resolve(entity, None);
                    sink.merge(key, partial)?;
                    stats.record_entity(1, 0);
                }
                None => stats.record_entity(0, 1),
            }
            Ok::<(), ExecutionError>(())
        })?;
        guard.check()?;

        let groups = sink.into_sorted();
        let count = groups.len();
        Ok(retention_finalization::into_result(
            plan,
            groups,
            stats.snapshot(count),
        ))
    }
}

/// Normalizes a raw spec.
pub fn compile(raw: &RawSpec) -> Result<CompiledSpec, ExecutionError> {
    plan::compile(raw).map_err(ExecutionError::from)
}

/// One-shot run with explicit settings.
pub fn execute(
    spec: &CompiledSpec,
    entities: &[Entity],
    settings: &Settings,
) -> Result<Report, ExecutionError> {
    Executor::new(settings)?.execute(spec, entities)
}

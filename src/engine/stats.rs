use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters attached to every report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Entities handed to the run
    pub entities: u64,
    /// Partial aggregates produced (entities, or pivot partitions)
    pub units: u64,
    pub groups: u64,
    /// Soft skips: events or entities that could not feed a metric
    pub skipped: u64,
}

/// Lock-free counters shared by the map workers.
#[derive(Debug, Default)]
pub struct StatsCollector {
    entities: AtomicU64,
    units: AtomicU64,
    skipped: AtomicU64,
}

impl StatsCollector {
    pub fn record_entity(&self, units: usize, skipped: usize) {
        self.entities.fetch_add(1, Ordering::Relaxed);
        self.units.fetch_add(units as u64, Ordering::Relaxed);
        self.skipped.fetch_add(skipped as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, groups: usize) -> ExecutionStats {
        ExecutionStats {
            entities: self.entities.load(Ordering::Relaxed),
            units: self.units.load(Ordering::Relaxed),
            groups: groups as u64,
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

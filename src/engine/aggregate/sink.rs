use ahash::RandomState as AHashRandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::group_key::GroupKey;
use super::partial::Mergeable;
use crate::engine::errors::ExecutionError;

/// Concurrent per-key merge target. Map workers insert partials directly;
/// the shard lock of each entry serializes merges into the same key.
pub struct AggregateSink<P> {
    groups: DashMap<GroupKey, P, AHashRandomState>,
}

impl<P: Mergeable> AggregateSink<P> {
    pub fn new() -> Self {
        Self {
            groups: DashMap::with_hasher(AHashRandomState::new()),
        }
    }

    pub fn merge(&self, key: GroupKey, partial: P) -> Result<(), ExecutionError> {
        match self.groups.entry(key) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(&partial),
            Entry::Vacant(slot) => {
                slot.insert(partial);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drains the sink into key order.
    pub fn into_sorted(self) -> Vec<(GroupKey, P)> {
        let mut groups: Vec<(GroupKey, P)> = self.groups.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(target: "snel_cohort::merge", groups = groups.len(), "Merged partial aggregates");
        groups
    }
}

impl<P: Mergeable> Default for AggregateSink<P> {
    fn default() -> Self {
        Self::new()
    }
}

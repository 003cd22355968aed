//! In-flight request counts per instance id.
//!
//! Counts are keyed by instance id alone, because `finish_request` is not told
//! the service. Two services registering the same id share one counter, which
//! lives until the last pool listing that id unregisters it.

use dashmap::DashMap;

use crate::observability::metrics;

#[derive(Debug, Default)]
pub struct ConnectionCounts {
    counts: DashMap<String, usize>,
}

impl ConnectionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count; 0 for unknown ids.
    pub fn get(&self, id: &str) -> usize {
        self.counts.get(id).map(|c| *c).unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.counts.contains_key(id)
    }

    /// Start tracking `id` at 0 unless it is already tracked.
    pub(crate) fn init(&self, id: &str) {
        self.counts.entry(id.to_string()).or_insert(0);
    }

    pub(crate) fn remove(&self, id: &str) -> Option<usize> {
        self.counts.remove(id).map(|(_, count)| count)
    }

    /// Add one in-flight request. `None` if `id` is not tracked.
    pub(crate) fn increment(&self, id: &str) -> Option<usize> {
        let count = {
            let mut count = self.counts.get_mut(id)?;
            *count += 1;
            *count
        };
        metrics::record_active_connections(id, count);
        Some(count)
    }

    /// Remove one in-flight request, never going below zero.
    pub(crate) fn decrement(&self, id: &str) -> Option<usize> {
        let count = {
            let mut count = self.counts.get_mut(id)?;
            *count = count.saturating_sub(1);
            *count
        };
        metrics::record_active_connections(id, count);
        Some(count)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| *c.value()).sum()
    }
}

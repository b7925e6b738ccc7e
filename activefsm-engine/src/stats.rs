//! Engine counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live engine counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub triggers_accepted: AtomicU64,
    pub triggers_rejected: AtomicU64,
    pub triggers_processed: AtomicU64,
    pub triggers_ignored: AtomicU64,
    pub triggers_discarded: AtomicU64,
    pub transitions_completed: AtomicU64,
    pub transitions_rejected: AtomicU64,
    pub worker_faults: AtomicU64,
    pub worker_restarts: AtomicU64,
}

impl EngineStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            triggers_accepted: self.triggers_accepted.load(Ordering::Relaxed),
            triggers_rejected: self.triggers_rejected.load(Ordering::Relaxed),
            triggers_processed: self.triggers_processed.load(Ordering::Relaxed),
            triggers_ignored: self.triggers_ignored.load(Ordering::Relaxed),
            triggers_discarded: self.triggers_discarded.load(Ordering::Relaxed),
            transitions_completed: self.transitions_completed.load(Ordering::Relaxed),
            transitions_rejected: self.transitions_rejected.load(Ordering::Relaxed),
            worker_faults: self.worker_faults.load(Ordering::Relaxed),
            worker_restarts: self.worker_restarts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub triggers_accepted: u64,
    pub triggers_rejected: u64,
    /// Dequeued triggers, whether they matched, were rejected or faulted.
    pub triggers_processed: u64,
    /// Processed triggers with no matching transition.
    pub triggers_ignored: u64,
    /// Queued triggers dropped at shutdown.
    pub triggers_discarded: u64,
    pub transitions_completed: u64,
    pub transitions_rejected: u64,
    pub worker_faults: u64,
    pub worker_restarts: u64,
}

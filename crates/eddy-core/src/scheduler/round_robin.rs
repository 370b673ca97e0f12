//! Round-robin scheduling over a shared instance list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use super::{Scheduler, SchedulerStats, SchedulerStatsSnapshot, SchedulingPolicy};
use crate::instance::OperatorInstance;

/// Round-robin scheduler.
///
/// Every worker sees every instance; fairness comes from per-worker
/// cursors that advance on each probe, hit or miss. Cursors are
/// cache-padded so concurrent `next` calls do not false-share, and are
/// keyed by worker id fixed at construction.
pub struct RoundRobinScheduler {
    instances: Vec<Arc<OperatorInstance>>,
    cursors: Vec<CachePadded<AtomicUsize>>,
    stats: SchedulerStats,
}

impl RoundRobinScheduler {
    /// Creates a scheduler over `instances` for `num_workers` workers.
    #[must_use]
    pub fn new(instances: Vec<Arc<OperatorInstance>>, num_workers: u32) -> Self {
        let cursors = (0..num_workers)
            .map(|_| CachePadded::new(AtomicUsize::new(0)))
            .collect();
        Self {
            instances,
            cursors,
            stats: SchedulerStats::default(),
        }
    }
}

impl Scheduler for RoundRobinScheduler {
    fn next(&self, worker_id: u32) -> Option<Arc<OperatorInstance>> {
        self.stats.total_scheduled.fetch_add(1, Ordering::Relaxed);

        let len = self.instances.len();
        if len > 0 {
            let cursor = &self.cursors[worker_id as usize];
            for _ in 0..len {
                let pos = cursor.fetch_add(1, Ordering::Relaxed) % len;
                let instance = &self.instances[pos];
                if instance.has_work() {
                    return Some(Arc::clone(instance));
                }
            }
        }

        self.stats.idle_cycles.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn stats(&self) -> SchedulerStatsSnapshot {
        self.stats.snapshot()
    }

    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::RoundRobin
    }
}

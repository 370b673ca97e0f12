//! Operator scheduling: which instance should a worker run next?
//!
//! A scheduler answers [`Scheduler::next`] for each worker; `None` means
//! "no ready work" and the worker yields. An instance is *ready* iff its
//! input queue is non-empty; sources never appear here, they run on
//! dedicated threads.
//!
//! Two policies are implemented:
//!
//! | Policy | Instance visibility | Idle behavior |
//! |---|---|---|
//! | [`RoundRobinScheduler`] | all workers see all instances | probe N, give up |
//! | [`WorkStealingScheduler`] | partitioned, random victims | steal, then give up |
//!
//! `Priority` and `LoadAware` are accepted in the policy enum and fall
//! back to round-robin.

mod round_robin;
mod work_stealing;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use round_robin::RoundRobinScheduler;
pub use work_stealing::WorkStealingScheduler;

use crate::instance::OperatorInstance;

/// Scheduling policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingPolicy {
    /// Cycle through a shared instance list.
    #[default]
    RoundRobin,
    /// Partitioned instances; idle workers steal from random victims.
    WorkStealing,
    /// Reserved; currently falls back to round-robin.
    Priority,
    /// Reserved; currently falls back to round-robin.
    LoadAware,
}

/// Shared scheduler counters.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// `next` calls, regardless of outcome.
    pub total_scheduled: AtomicU64,
    /// `next` calls that found no ready instance.
    pub idle_cycles: AtomicU64,
    /// Ready instances found in another worker's partition.
    pub work_stolen: AtomicU64,
    /// Reserved for notification-based policies.
    pub backpressure_waits: AtomicU64,
}

impl SchedulerStats {
    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            total_scheduled: self.total_scheduled.load(Ordering::Relaxed),
            idle_cycles: self.idle_cycles.load(Ordering::Relaxed),
            work_stolen: self.work_stolen.load(Ordering::Relaxed),
            backpressure_waits: self.backpressure_waits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`SchedulerStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStatsSnapshot {
    /// `next` calls, regardless of outcome.
    pub total_scheduled: u64,
    /// `next` calls that found no ready instance.
    pub idle_cycles: u64,
    /// Cross-partition hits.
    pub work_stolen: u64,
    /// Reserved.
    pub backpressure_waits: u64,
}

/// Picks the next instance a worker should execute.
///
/// `next` must be safe for concurrent calls from every worker; both
/// provided variants keep per-worker cursor/PRNG state in slots fixed at
/// construction, so there is no cross-worker contention beyond the
/// shared counters.
pub trait Scheduler: Send + Sync {
    /// Returns the next ready instance for `worker_id`, or `None` when no
    /// instance has queued input.
    fn next(&self, worker_id: u32) -> Option<Arc<OperatorInstance>>;

    /// Hook for notification-based policies. The provided variants poll,
    /// so this is a no-op.
    fn notify_work_available(&self) {}

    /// Returns the scheduler counters.
    fn stats(&self) -> SchedulerStatsSnapshot;

    /// Returns the policy this scheduler implements.
    fn policy(&self) -> SchedulingPolicy;
}

/// Builds a scheduler for `policy` over `instances`, sized for
/// `num_workers` workers.
///
/// `Priority` and `LoadAware` fall back to round-robin.
#[must_use]
pub fn create_scheduler(
    policy: SchedulingPolicy,
    instances: Vec<Arc<OperatorInstance>>,
    num_workers: u32,
) -> Arc<dyn Scheduler> {
    match policy {
        SchedulingPolicy::WorkStealing => {
            Arc::new(WorkStealingScheduler::new(instances, num_workers))
        }
        SchedulingPolicy::RoundRobin | SchedulingPolicy::Priority | SchedulingPolicy::LoadAware => {
            Arc::new(RoundRobinScheduler::new(instances, num_workers))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::event::Event;
    use crate::operator::{op_fn, EmitContext, OperatorStats};
    use crate::queue::BoundedQueue;

    /// Builds a pass-through instance with its own input queue.
    pub fn stub_instance(name: &str) -> (Arc<OperatorInstance>, Arc<BoundedQueue>) {
        let input = Arc::new(BoundedQueue::new(16));
        let stats = Arc::new(OperatorStats::default());
        let ctx = EmitContext::new(name, 0).with_stats(Arc::clone(&stats));
        let op = op_fn(name, |_event: Event, _ctx: &mut EmitContext| {});
        let instance = OperatorInstance::new(op, Some(Arc::clone(&input)), ctx, stats);
        (Arc::new(instance), input)
    }
}

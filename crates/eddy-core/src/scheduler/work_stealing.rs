//! Work-stealing scheduling over partitioned instances.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{Scheduler, SchedulerStats, SchedulerStatsSnapshot, SchedulingPolicy};
use crate::instance::OperatorInstance;

/// Work-stealing scheduler.
///
/// Instances are partitioned round-robin by index at construction. A
/// worker scans its own partition first; if nothing is ready it probes up
/// to `num_workers` uniformly-random victims, never itself, so the whole
/// retry budget is spent on other workers' partitions. Each worker slot
/// has its own PRNG behind a mutex that only that worker touches, so
/// victim selection never contends. Determinism is not a goal.
pub struct WorkStealingScheduler {
    partitions: Vec<Vec<Arc<OperatorInstance>>>,
    num_workers: u32,
    rngs: Vec<Mutex<SmallRng>>,
    stats: SchedulerStats,
}

impl WorkStealingScheduler {
    /// Creates a scheduler over `instances`, partitioned across
    /// `num_workers` workers (minimum 1).
    #[must_use]
    pub fn new(instances: Vec<Arc<OperatorInstance>>, num_workers: u32) -> Self {
        let num_workers = num_workers.max(1);
        let mut partitions: Vec<Vec<Arc<OperatorInstance>>> =
            (0..num_workers).map(|_| Vec::new()).collect();
        for (i, instance) in instances.into_iter().enumerate() {
            partitions[i % num_workers as usize].push(instance);
        }
        let rngs = (0..num_workers)
            .map(|_| Mutex::new(SmallRng::from_entropy()))
            .collect();
        Self {
            partitions,
            num_workers,
            rngs,
            stats: SchedulerStats::default(),
        }
    }

    /// Returns the number of instances in `worker_id`'s own partition.
    #[must_use]
    pub fn partition_len(&self, worker_id: u32) -> usize {
        self.partitions[worker_id as usize].len()
    }

    fn scan(partition: &[Arc<OperatorInstance>]) -> Option<Arc<OperatorInstance>> {
        partition
            .iter()
            .find(|instance| instance.has_work())
            .map(Arc::clone)
    }
}

impl Scheduler for WorkStealingScheduler {
    fn next(&self, worker_id: u32) -> Option<Arc<OperatorInstance>> {
        self.stats.total_scheduled.fetch_add(1, Ordering::Relaxed);

        // Local partition first.
        if let Some(instance) = Self::scan(&self.partitions[worker_id as usize]) {
            return Some(instance);
        }

        // Steal from random victims. Drawing a non-zero offset from our
        // own id makes every attempt land on some other worker.
        if self.num_workers > 1 {
            let mut rng = self.rngs[worker_id as usize].lock();
            for _ in 0..self.num_workers {
                let offset = rng.gen_range(1..self.num_workers);
                let victim = (worker_id + offset) % self.num_workers;
                if let Some(instance) = Self::scan(&self.partitions[victim as usize]) {
                    self.stats.work_stolen.fetch_add(1, Ordering::Relaxed);
                    return Some(instance);
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
        SchedulingPolicy::WorkStealing
    }
}

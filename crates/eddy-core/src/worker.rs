//! Worker threads that drive the scheduler.
//!
//! Each worker loops: ask the scheduler for an instance, drain a batch
//! from it, or yield when there is nothing to do. Workers never block on
//! queues — batching uses `try_pop`, and an idle worker spins through
//! `yield_now` until the scheduler finds work or the pool stops.
//!
//! `stop()` flips the shared running flag and joins every thread; a
//! worker observing the flag exits at the top of its loop, so an
//! in-flight batch always completes (events taken from a queue are never
//! abandoned).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::instance::DEFAULT_BATCH_SIZE;
use crate::scheduler::Scheduler;

/// Per-worker counters, updated only by the owning thread.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Events drained through `execute_batch`.
    pub events_processed: AtomicU64,
    /// Loop iterations, busy or idle.
    pub iterations: AtomicU64,
    /// Nanoseconds spent on iterations that found work.
    pub active_time_ns: AtomicU64,
    /// Nanoseconds spent on iterations that found none.
    pub idle_time_ns: AtomicU64,
}

impl WorkerStats {
    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
            active_time_ns: self.active_time_ns.load(Ordering::Relaxed),
            idle_time_ns: self.idle_time_ns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`WorkerStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerStatsSnapshot {
    /// Events drained through `execute_batch`.
    pub events_processed: u64,
    /// Loop iterations.
    pub iterations: u64,
    /// Nanoseconds spent busy.
    pub active_time_ns: u64,
    /// Nanoseconds spent idle.
    pub idle_time_ns: u64,
}

struct Worker {
    id: u32,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

fn worker_loop(id: u32, scheduler: &Arc<dyn Scheduler>, running: &AtomicBool, stats: &WorkerStats) {
    tracing::debug!(worker = id, "worker started");

    while running.load(Ordering::Acquire) {
        stats.iterations.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        if let Some(instance) = scheduler.next(id) {
            let processed = instance.execute_batch(DEFAULT_BATCH_SIZE);
            stats
                .events_processed
                .fetch_add(processed as u64, Ordering::Relaxed);
            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ns = started.elapsed().as_nanos() as u64;
            stats.active_time_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ns = started.elapsed().as_nanos() as u64;
            stats.idle_time_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
            thread::yield_now();
        }
    }

    tracing::debug!(worker = id, "worker stopped");
}

/// Fixed pool of worker threads sharing one scheduler.
pub struct WorkerPool {
    workers: Vec<Worker>,
    scheduler: Arc<dyn Scheduler>,
    running: Arc<AtomicBool>,
    num_workers: u32,
}

impl WorkerPool {
    /// Creates a pool of `num_workers` workers (minimum 1) over
    /// `scheduler`. Threads are not started until [`start`].
    ///
    /// [`start`]: WorkerPool::start
    #[must_use]
    pub fn new(num_workers: u32, scheduler: Arc<dyn Scheduler>) -> Self {
        let num_workers = num_workers.max(1);
        let workers = (0..num_workers)
            .map(|id| Worker {
                id,
                stats: Arc::new(WorkerStats::default()),
                handle: None,
            })
            .collect();
        Self {
            workers,
            scheduler,
            running: Arc::new(AtomicBool::new(false)),
            num_workers,
        }
    }

    /// Returns the number of workers.
    #[must_use]
    pub fn num_workers(&self) -> u32 {
        self.num_workers
    }

    /// Returns `true` while worker threads are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawns all worker threads. Idempotent while running.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker in &mut self.workers {
            let id = worker.id;
            let scheduler = Arc::clone(&self.scheduler);
            let running = Arc::clone(&self.running);
            let stats = Arc::clone(&worker.stats);
            let handle = thread::Builder::new()
                .name(format!("eddy-worker-{id}"))
                .spawn(move || worker_loop(id, &scheduler, &running, &stats))
                .expect("failed to spawn worker thread");
            worker.handle = Some(handle);
        }
        tracing::info!(workers = self.num_workers, "worker pool started");
    }

    /// Stops and joins every worker thread. Idempotent.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    tracing::warn!(worker = worker.id, "worker thread panicked");
                }
            }
        }
        tracing::info!(workers = self.num_workers, "worker pool stopped");
    }

    /// Returns per-worker counter snapshots, indexed by worker id.
    #[must_use]
    pub fn stats(&self) -> Vec<WorkerStatsSnapshot> {
        self.workers.iter().map(|w| w.stats.snapshot()).collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::scheduler::{create_scheduler, SchedulingPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::scheduler::testing::stub_instance;

    #[test]
    fn test_pool_spawns_and_stops() {
        let sched = create_scheduler(SchedulingPolicy::RoundRobin, Vec::new(), 2);
        let mut pool = WorkerPool::new(2, sched);
        assert!(!pool.is_running());
        pool.start();
        assert!(pool.is_running());
        pool.stop();
        assert!(!pool.is_running());
        // Idempotent.
        pool.stop();
    }

    #[test]
    fn test_workers_drain_queued_events() {
        let (instance, input) = stub_instance("drain");
        let sched = create_scheduler(SchedulingPolicy::RoundRobin, vec![instance], 2);
        let mut pool = WorkerPool::new(2, sched);

        for i in 0..200i64 {
            input.push(Event::new(i));
        }
        pool.start();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !input.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        pool.stop();

        assert!(input.is_empty());
        let total: u64 = pool.stats().iter().map(|s| s.events_processed).sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn test_stats_account_iterations() {
        let sched = create_scheduler(SchedulingPolicy::RoundRobin, Vec::new(), 1);
        let mut pool = WorkerPool::new(1, sched);
        pool.start();
        thread::sleep(Duration::from_millis(20));
        pool.stop();
        let stats = pool.stats();
        assert_eq!(stats.len(), 1);
        assert!(stats[0].iterations > 0);
        assert!(stats[0].idle_time_ns > 0);
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let sched = create_scheduler(SchedulingPolicy::RoundRobin, Vec::new(), 1);
        let pool = WorkerPool::new(0, sched);
        assert_eq!(pool.num_workers(), 1);
    }
}

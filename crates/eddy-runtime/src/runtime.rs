//! Runtime coordinator: graph materialization and lifecycle.
//!
//! The runtime owns everything the engine needs at execution time —
//! queues, operator instances, the scheduler, the worker pool, and one
//! dedicated thread per source — and walks the lifecycle
//! `Created → Initialized → Running → ShuttingDown → Stopped`.
//!
//! # Shutdown
//!
//! `stop()` is graceful and ordered:
//!
//! 1. Request every source to stop and join the source threads.
//! 2. Drain: poll the queues until all are empty (workers keep
//!    consuming), sleeping briefly between polls. Drain waits; it never
//!    forces.
//! 3. Close every queue (wakes anything still blocked) and stop the
//!    worker pool; in-flight batches finish first.
//! 4. Run `shutdown` on every operator, exactly once.
//!
//! Sources that exhaust naturally close their output queues on the way
//! out, so downstream operators see end-of-stream without waiting for
//! `stop()`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use eddy_core::instance::{OperatorInstance, SourceInstance};
use eddy_core::metrics::{MetricsCollector, RuntimeMetricsSnapshot};
use eddy_core::operator::{
    EmitContext, OperatorKind, OperatorState, OperatorStats, OperatorStatsSnapshot, SinkAdapter,
    StopToken,
};
use eddy_core::queue::{BoundedQueue, QueueStats};
use eddy_core::scheduler::{create_scheduler, Scheduler, SchedulerStatsSnapshot};
use eddy_core::worker::{WorkerPool, WorkerStatsSnapshot};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::graph::GraphBuilder;

/// Interval between queue-emptiness polls during drain.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle state of a [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Constructed; no graph yet.
    Created,
    /// Graph materialized, operators initialized.
    Initialized,
    /// Workers and sources running.
    Running,
    /// Graceful stop in progress.
    ShuttingDown,
    /// Fully stopped; terminal.
    Stopped,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::Initialized => "Initialized",
            Self::Running => "Running",
            Self::ShuttingDown => "ShuttingDown",
            Self::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Handle to a running source thread.
struct SourceHandle {
    name: String,
    stop: StopToken,
    thread: JoinHandle<SourceInstance>,
}

/// Latch for stopping the metrics reporter thread.
type ReporterLatch = Arc<(Mutex<bool>, Condvar)>;

struct ReporterHandle {
    latch: ReporterLatch,
    thread: JoinHandle<()>,
}

/// The stream-processing runtime.
///
/// # Example
///
/// ```no_run
/// use eddy_runtime::config::RuntimeConfig;
/// use eddy_runtime::graph::GraphBuilder;
/// use eddy_runtime::operators::{CountingSink, SequenceSource};
/// use eddy_runtime::runtime::Runtime;
///
/// let sink = CountingSink::new("sink");
/// let counter = sink.counter();
///
/// let graph = GraphBuilder::new()
///     .add_source(Box::new(SequenceSource::from_range("nums", 1, 1000)))
///     .add_sink(Box::new(sink))
///     .connect("nums", "sink");
///
/// let mut runtime = Runtime::new(RuntimeConfig::default());
/// runtime.init(graph).unwrap();
/// runtime.start().unwrap();
/// runtime.await_completion();
/// runtime.stop();
/// assert_eq!(counter.count(), 1000);
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    state: RuntimeState,
    queues: Vec<Arc<BoundedQueue>>,
    instances: Vec<Arc<OperatorInstance>>,
    /// Sources between `init` and `start`.
    idle_sources: Vec<SourceInstance>,
    /// Source threads while running.
    source_handles: Vec<SourceHandle>,
    /// Sources reclaimed from joined threads, awaiting `shutdown`.
    finished_sources: Vec<SourceInstance>,
    scheduler: Option<Arc<dyn Scheduler>>,
    pool: Option<WorkerPool>,
    metrics: Arc<MetricsCollector>,
    running: Arc<AtomicBool>,
    reporter: Option<ReporterHandle>,
}

impl Runtime {
    /// Creates a runtime in the `Created` state.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            state: RuntimeState::Created,
            queues: Vec::new(),
            instances: Vec::new(),
            idle_sources: Vec::new(),
            source_handles: Vec::new(),
            finished_sources: Vec::new(),
            scheduler: None,
            pool: None,
            metrics: Arc::new(MetricsCollector::new()),
            running: Arc::new(AtomicBool::new(false)),
            reporter: None,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the global metrics collector.
    #[must_use]
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Takes a metrics snapshot.
    #[must_use]
    pub fn metrics_snapshot(&self) -> RuntimeMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns per-queue statistics, in edge-declaration order.
    #[must_use]
    pub fn queue_stats(&self) -> Vec<QueueStats> {
        self.queues.iter().map(|q| q.stats()).collect()
    }

    /// Returns per-worker statistics, indexed by worker id.
    #[must_use]
    pub fn worker_stats(&self) -> Vec<WorkerStatsSnapshot> {
        self.pool.as_ref().map(WorkerPool::stats).unwrap_or_default()
    }

    /// Returns scheduler statistics, if initialized.
    #[must_use]
    pub fn scheduler_stats(&self) -> Option<SchedulerStatsSnapshot> {
        self.scheduler.as_ref().map(|s| s.stats())
    }

    /// Returns per-operator statistics by name, scheduled instances and
    /// sources alike.
    #[must_use]
    pub fn operator_stats(&self) -> Vec<(String, OperatorStatsSnapshot)> {
        let mut stats: Vec<(String, OperatorStatsSnapshot)> = self
            .instances
            .iter()
            .map(|i| (i.name().to_string(), i.stats().snapshot()))
            .collect();
        for source in self.idle_sources.iter().chain(&self.finished_sources) {
            stats.push((source.name().to_string(), source.stats().snapshot()));
        }
        stats
    }

    /// Materializes `graph`: queues per edge, instances per node, the
    /// scheduler and worker pool, then `init` on every operator.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::InvalidState`] unless the runtime is `Created`;
    /// any of the validation errors documented on
    /// [`GraphBuilder::validate`].
    pub fn init(&mut self, graph: GraphBuilder) -> Result<(), RuntimeError> {
        if self.state != RuntimeState::Created {
            return Err(RuntimeError::InvalidState {
                expected: RuntimeState::Created,
                actual: self.state,
            });
        }
        graph.validate()?;

        let (nodes, edges) = graph.into_parts();

        // One queue per edge, indexed by downstream name (input) and
        // grouped by upstream name (outputs, in declaration order).
        let mut inputs: FxHashMap<String, Arc<BoundedQueue>> = FxHashMap::default();
        let mut outputs: FxHashMap<String, Vec<Arc<BoundedQueue>>> = FxHashMap::default();
        for edge in &edges {
            let capacity = edge.capacity.unwrap_or(self.config.default_queue_capacity);
            let queue = Arc::new(BoundedQueue::new(capacity));
            self.queues.push(Arc::clone(&queue));
            outputs
                .entry(edge.from.clone())
                .or_default()
                .push(Arc::clone(&queue));
            inputs.insert(edge.to.clone(), queue);
        }

        // Wrap every node in its instance, sources separately.
        for (instance_id, node) in (0u32..).zip(nodes) {
            let name = node.name().to_string();
            let stats = Arc::new(OperatorStats::default());
            let mut ctx =
                EmitContext::new(name.clone(), instance_id).with_stats(Arc::clone(&stats));
            for queue in outputs.remove(&name).unwrap_or_default() {
                ctx.add_output(queue);
            }

            match node {
                OperatorKind::Source(source) => {
                    let stop = StopToken::new();
                    let ctx = ctx.with_stop_token(stop.clone());
                    self.idle_sources
                        .push(SourceInstance::new(source, ctx, stop, stats));
                }
                OperatorKind::Transform(op) => {
                    let input = inputs.get(&name).cloned();
                    self.instances
                        .push(Arc::new(OperatorInstance::new(op, input, ctx, stats)));
                }
                OperatorKind::Sink(sink) => {
                    let input = inputs.get(&name).cloned();
                    let adapter = Box::new(SinkAdapter::new(sink));
                    self.instances
                        .push(Arc::new(OperatorInstance::new(adapter, input, ctx, stats)));
                }
            }
        }

        let workers = self.config.effective_workers();
        let scheduler = create_scheduler(
            self.config.scheduling_policy,
            self.instances.clone(),
            workers,
        );
        self.pool = Some(WorkerPool::new(workers, Arc::clone(&scheduler)));
        self.scheduler = Some(scheduler);

        for instance in &self.instances {
            instance.init();
        }
        for source in &mut self.idle_sources {
            source.init();
        }

        self.state = RuntimeState::Initialized;
        tracing::info!(
            operators = self.instances.len(),
            sources = self.idle_sources.len(),
            queues = self.queues.len(),
            workers,
            policy = ?self.config.scheduling_policy,
            "runtime initialized"
        );
        Ok(())
    }

    /// Starts the worker pool and one dedicated thread per source.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::InvalidState`] unless the runtime is `Initialized`.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.state != RuntimeState::Initialized {
            return Err(RuntimeError::InvalidState {
                expected: RuntimeState::Initialized,
                actual: self.state,
            });
        }

        self.running.store(true, Ordering::Release);
        self.state = RuntimeState::Running;

        for instance in &self.instances {
            instance.set_state(OperatorState::Running);
        }
        if let Some(pool) = self.pool.as_mut() {
            pool.start();
        }

        for source in self.idle_sources.drain(..) {
            let handle = spawn_source_thread(
                source,
                Arc::clone(&self.running),
                Arc::clone(&self.metrics),
                self.config.enable_metrics,
            );
            self.source_handles.push(handle);
        }

        if self.config.enable_metrics && !self.config.metrics_interval.is_zero() {
            self.reporter = Some(spawn_metrics_reporter(
                Arc::clone(&self.metrics),
                self.config.metrics_interval,
            ));
        }

        tracing::info!(sources = self.source_handles.len(), "runtime started");
        Ok(())
    }

    /// Stops the runtime gracefully. No effect unless `Running`.
    pub fn stop(&mut self) {
        if self.state != RuntimeState::Running {
            return;
        }
        self.state = RuntimeState::ShuttingDown;
        tracing::info!("runtime shutting down");

        // Sources first, so no new events enter the graph.
        for handle in &self.source_handles {
            handle.stop.request();
        }
        self.join_sources();

        // Let the workers finish what is already queued.
        self.drain_queues();

        self.running.store(false, Ordering::Release);
        for queue in &self.queues {
            queue.close();
        }
        if let Some(pool) = self.pool.as_mut() {
            pool.stop();
        }

        if let Some(reporter) = self.reporter.take() {
            let (lock, cvar) = &*reporter.latch;
            *lock.lock() = true;
            cvar.notify_one();
            if reporter.thread.join().is_err() {
                tracing::warn!("metrics reporter thread panicked");
            }
        }

        for instance in &self.instances {
            instance.shutdown();
        }
        for source in &mut self.finished_sources {
            source.shutdown();
        }

        self.state = RuntimeState::Stopped;
        tracing::info!(
            events = self.metrics.events_processed().value(),
            "runtime stopped"
        );
    }

    /// Joins every source thread without changing the lifecycle state.
    ///
    /// Blocks until all sources have finished generating — intended for
    /// naturally finite sources. The workers keep running; call
    /// [`stop`](Runtime::stop) afterwards to drain and shut down.
    pub fn await_completion(&mut self) {
        self.join_sources();
    }

    fn join_sources(&mut self) {
        for handle in self.source_handles.drain(..) {
            match handle.thread.join() {
                Ok(source) => self.finished_sources.push(source),
                Err(_) => {
                    tracing::warn!(source = %handle.name, "source thread panicked");
                }
            }
        }
    }

    /// Polls all queues until empty, sleeping between polls.
    fn drain_queues(&self) {
        loop {
            if self.queues.iter().all(|q| q.is_empty()) {
                return;
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the dedicated thread for one source.
fn spawn_source_thread(
    mut source: SourceInstance,
    running: Arc<AtomicBool>,
    metrics: Arc<MetricsCollector>,
    count_events: bool,
) -> SourceHandle {
    let name = source.name().to_string();
    let stop = source.stop_token();

    let thread = thread::Builder::new()
        .name(format!("eddy-source-{name}"))
        .spawn(move || {
            source.set_state(OperatorState::Running);
            tracing::debug!(source = %source.name(), "source thread started");

            while running.load(Ordering::Acquire) && !source.should_stop() {
                let started = Instant::now();
                if !source.generate() {
                    // Natural exhaustion closes the outputs so downstream
                    // operators see end-of-stream; a requested stop leaves
                    // them open for the coordinated shutdown.
                    if !source.should_stop() {
                        source.close_outputs();
                        tracing::debug!(source = %source.name(), "source exhausted");
                    }
                    break;
                }
                if count_events {
                    metrics.events_processed().increment();
                    metrics
                        .processing_latency()
                        .observe(started.elapsed().as_secs_f64());
                }
            }

            tracing::debug!(source = %source.name(), "source thread stopped");
            source
        })
        .expect("failed to spawn source thread");

    SourceHandle { name, stop, thread }
}

/// Spawns the periodic metrics reporter.
fn spawn_metrics_reporter(metrics: Arc<MetricsCollector>, interval: Duration) -> ReporterHandle {
    let latch: ReporterLatch = Arc::new((Mutex::new(false), Condvar::new()));
    let thread_latch = Arc::clone(&latch);

    let thread = thread::Builder::new()
        .name("eddy-metrics".to_string())
        .spawn(move || {
            let (lock, cvar) = &*thread_latch;
            let mut stopped = lock.lock();
            while !*stopped {
                if cvar.wait_for(&mut stopped, interval).timed_out() {
                    let snap = metrics.snapshot();
                    tracing::debug!(
                        events = snap.events_processed,
                        rate = snap.events_per_second,
                        latency_ms = snap.avg_latency_ms,
                        dropped = snap.events_dropped,
                        backpressure = snap.backpressure_events,
                        "runtime metrics"
                    );
                }
            }
        })
        .expect("failed to spawn metrics reporter thread");

    ReporterHandle { latch, thread }
}

//! Runtime configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use eddy_core::scheduler::SchedulingPolicy;

/// Default queue capacity for edges that don't specify one.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Default metrics snapshot interval.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker thread count. `0` means auto-detect: hardware concurrency,
    /// falling back to 4 when that is unavailable.
    pub num_workers: u32,

    /// Capacity for edges declared without an explicit capacity.
    pub default_queue_capacity: usize,

    /// Scheduler variant. `Priority` and `LoadAware` are accepted and
    /// currently fall back to round-robin.
    pub scheduling_policy: SchedulingPolicy,

    /// Enables counter increments on hot paths and the periodic metrics
    /// reporter thread.
    pub enable_metrics: bool,

    /// Interval between metrics snapshots.
    pub metrics_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_workers: 0,
            default_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            scheduling_policy: SchedulingPolicy::RoundRobin,
            enable_metrics: true,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
        }
    }
}

impl RuntimeConfig {
    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Resolves `num_workers`, applying the auto-detect rule.
    #[must_use]
    pub fn effective_workers(&self) -> u32 {
        if self.num_workers > 0 {
            return self.num_workers;
        }
        let detected = std::thread::available_parallelism().map_or(4, NonZeroUsize::get);
        u32::try_from(detected).unwrap_or(u32::MAX)
    }
}

/// Builder for [`RuntimeConfig`].
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    num_workers: Option<u32>,
    default_queue_capacity: Option<usize>,
    scheduling_policy: Option<SchedulingPolicy>,
    enable_metrics: Option<bool>,
    metrics_interval: Option<Duration>,
}

impl RuntimeConfigBuilder {
    /// Sets the worker thread count (`0` = auto).
    #[must_use]
    pub fn num_workers(mut self, workers: u32) -> Self {
        self.num_workers = Some(workers);
        self
    }

    /// Sets the default queue capacity.
    #[must_use]
    pub fn default_queue_capacity(mut self, capacity: usize) -> Self {
        self.default_queue_capacity = Some(capacity);
        self
    }

    /// Sets the scheduling policy.
    #[must_use]
    pub fn scheduling_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.scheduling_policy = Some(policy);
        self
    }

    /// Enables or disables metrics.
    #[must_use]
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Sets the metrics snapshot interval.
    #[must_use]
    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    /// Builds the configuration, filling unset fields with defaults.
    #[must_use]
    pub fn build(self) -> RuntimeConfig {
        let defaults = RuntimeConfig::default();
        RuntimeConfig {
            num_workers: self.num_workers.unwrap_or(defaults.num_workers),
            default_queue_capacity: self
                .default_queue_capacity
                .unwrap_or(defaults.default_queue_capacity),
            scheduling_policy: self
                .scheduling_policy
                .unwrap_or(defaults.scheduling_policy),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
            metrics_interval: self.metrics_interval.unwrap_or(defaults.metrics_interval),
        }
    }
}

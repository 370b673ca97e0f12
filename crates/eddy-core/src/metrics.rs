//! Engine-level metrics primitives.
//!
//! Counters and gauges are relaxed atomics: they are advisory, monotonic
//! (counters) or last-write-wins (gauges), and never synchronize the data
//! path. Aggregation and human-readable formatting live outside the
//! engine; this module only maintains the numbers.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Increments by one.
    #[inline]
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments by `n`.
    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns the current value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Resets to zero.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Gauge that can move in both directions.
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    /// Sets the gauge to `value`.
    #[inline]
    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Adds `delta` to the gauge.
    #[inline]
    pub fn add(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }

    /// Subtracts `delta` from the gauge.
    #[inline]
    pub fn sub(&self, delta: i64) {
        self.0.fetch_sub(delta, Ordering::Relaxed);
    }

    /// Returns the current value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket latency histogram (seconds).
///
/// Coarse by design: callers that need percentiles export the raw
/// observations elsewhere.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: Mutex<HistogramState>,
}

#[derive(Debug)]
struct HistogramState {
    buckets: Vec<f64>,
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

impl LatencyHistogram {
    /// Default bucket upper bounds, in seconds.
    #[must_use]
    pub fn default_buckets() -> Vec<f64> {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]
    }

    /// Creates a histogram with the given bucket upper bounds.
    /// The final overflow bucket is implicit.
    #[must_use]
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self {
            inner: Mutex::new(HistogramState {
                buckets,
                counts,
                sum: 0.0,
                count: 0,
            }),
        }
    }

    /// Records one observation.
    pub fn observe(&self, value: f64) {
        let mut state = self.inner.lock();
        state.sum += value;
        state.count += 1;
        let idx = state
            .buckets
            .iter()
            .position(|&upper| value <= upper)
            .unwrap_or(state.buckets.len());
        state.counts[idx] += 1;
    }

    /// Returns the sum of all observations.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.inner.lock().sum
    }

    /// Returns the number of observations.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    /// Returns the mean observation, or 0.0 if empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        let state = self.inner.lock();
        if state.count == 0 {
            0.0
        } else {
            state.sum / state.count as f64
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new(Self::default_buckets())
    }
}

/// Point-in-time snapshot of the global runtime counters.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeMetricsSnapshot {
    /// Events generated by sources so far.
    pub events_processed: u64,
    /// Events explicitly discarded by operators or dead fan-outs.
    pub events_dropped: u64,
    /// Source emissions refused by every output.
    pub backpressure_events: u64,
    /// Generation rate since the previous snapshot, events per second.
    pub events_per_second: u64,
    /// Mean generation latency in milliseconds, over all observations.
    pub avg_latency_ms: f64,
    /// Time since the collector was created.
    pub uptime: Duration,
}

/// Collector for the runtime-global counters.
///
/// Shared by the coordinator, source threads, and anyone holding the
/// runtime handle. Counter updates are wait-free; only `snapshot()` takes
/// a short lock for rate bookkeeping.
#[derive(Debug)]
pub struct MetricsCollector {
    started: Instant,
    events_processed: Counter,
    events_dropped: Counter,
    backpressure_events: Counter,
    processing_latency: LatencyHistogram,
    rate: Mutex<RateWindow>,
}

#[derive(Debug)]
struct RateWindow {
    last_snapshot: Instant,
    last_events: u64,
}

impl MetricsCollector {
    /// Creates a collector anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            events_processed: Counter::default(),
            events_dropped: Counter::default(),
            backpressure_events: Counter::default(),
            processing_latency: LatencyHistogram::default(),
            rate: Mutex::new(RateWindow {
                last_snapshot: now,
                last_events: 0,
            }),
        }
    }

    /// Counter of events generated by sources.
    #[inline]
    #[must_use]
    pub fn events_processed(&self) -> &Counter {
        &self.events_processed
    }

    /// Counter of explicitly discarded events.
    #[inline]
    #[must_use]
    pub fn events_dropped(&self) -> &Counter {
        &self.events_dropped
    }

    /// Counter of fully refused source emissions.
    #[inline]
    #[must_use]
    pub fn backpressure_events(&self) -> &Counter {
        &self.backpressure_events
    }

    /// Histogram of per-event generation latency, in seconds. Fed by the
    /// source threads; the snapshot reports its mean.
    #[inline]
    #[must_use]
    pub fn processing_latency(&self) -> &LatencyHistogram {
        &self.processing_latency
    }

    /// Returns time elapsed since the collector was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Takes a snapshot, advancing the rate window.
    #[must_use]
    pub fn snapshot(&self) -> RuntimeMetricsSnapshot {
        let now = Instant::now();
        let events = self.events_processed.value();

        let mut rate = self.rate.lock();
        let elapsed = now.duration_since(rate.last_snapshot).as_secs();
        let events_per_second = if elapsed > 0 {
            events.saturating_sub(rate.last_events) / elapsed
        } else {
            0
        };
        rate.last_snapshot = now;
        rate.last_events = events;
        drop(rate);

        RuntimeMetricsSnapshot {
            events_processed: events,
            events_dropped: self.events_dropped.value(),
            backpressure_events: self.backpressure_events.value(),
            events_per_second,
            avg_latency_ms: self.processing_latency.mean() * 1000.0,
            uptime: now.duration_since(self.started),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increment_and_reset() {
        let counter = Counter::default();
        counter.increment();
        counter.add(4);
        assert_eq!(counter.value(), 5);
        counter.reset();
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn test_gauge_moves_both_ways() {
        let gauge = Gauge::default();
        gauge.add(10);
        gauge.sub(3);
        assert_eq!(gauge.value(), 7);
        gauge.set(-2);
        assert_eq!(gauge.value(), -2);
    }

    #[test]
    fn test_histogram_mean() {
        let hist = LatencyHistogram::default();
        assert_eq!(hist.mean(), 0.0);
        hist.observe(0.002);
        hist.observe(0.004);
        assert_eq!(hist.count(), 2);
        assert!((hist.mean() - 0.003).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_overflow_bucket() {
        let hist = LatencyHistogram::new(vec![0.1, 1.0]);
        hist.observe(50.0);
        assert_eq!(hist.count(), 1);
        assert_eq!(hist.sum(), 50.0);
    }

    #[test]
    fn test_collector_snapshot() {
        let collector = MetricsCollector::new();
        collector.events_processed().add(100);
        collector.events_dropped().increment();
        let snap = collector.snapshot();
        assert_eq!(snap.events_processed, 100);
        assert_eq!(snap.events_dropped, 1);
        assert_eq!(snap.backpressure_events, 0);
        assert_eq!(snap.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_collector_latency_feeds_snapshot() {
        let collector = MetricsCollector::new();
        collector.processing_latency().observe(0.002);
        collector.processing_latency().observe(0.004);
        let snap = collector.snapshot();
        assert_eq!(collector.processing_latency().count(), 2);
        assert!((snap.avg_latency_ms - 3.0).abs() < 1e-9);
    }
}

//! Built-in sinks.
//!
//! Sinks are moved into the runtime at `init`, so each observable sink
//! hands out a cheap shared handle (`CounterHandle`, `AggregateHandle`)
//! that stays readable after the move — and after shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use eddy_core::event::{Event, Payload};
use eddy_core::operator::Sink;

/// Shared read handle for [`CountingSink`] and [`NullSink`].
#[derive(Debug, Clone, Default)]
pub struct CounterHandle(Arc<AtomicU64>);

impl CounterHandle {
    /// Returns the number of events consumed so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counts consumed events.
pub struct CountingSink {
    name: String,
    count: Arc<AtomicU64>,
}

impl CountingSink {
    /// Creates a counting sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns a handle that stays readable after the sink is moved into
    /// a graph.
    #[must_use]
    pub fn counter(&self) -> CounterHandle {
        CounterHandle(Arc::clone(&self.count))
    }
}

impl Sink for CountingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, _event: &Event) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Discards events, keeping only a consumed count.
pub struct NullSink {
    name: String,
    consumed: Arc<AtomicU64>,
}

impl NullSink {
    /// Creates a null sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns a handle to the consumed count.
    #[must_use]
    pub fn counter(&self) -> CounterHandle {
        CounterHandle(Arc::clone(&self.consumed))
    }
}

impl Sink for NullSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, _event: &Event) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Running aggregates over integer (and coerced float) payloads.
#[derive(Debug)]
struct AggregateState {
    sum: i64,
    count: u64,
    min: i64,
    max: i64,
}

impl Default for AggregateState {
    fn default() -> Self {
        Self {
            sum: 0,
            count: 0,
            min: i64::MAX,
            max: i64::MIN,
        }
    }
}

/// Point-in-time copy of an [`AggregatingSink`]'s state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateSnapshot {
    /// Sum of consumed values.
    pub sum: i64,
    /// Number of consumed values.
    pub count: u64,
    /// Smallest value seen (`i64::MAX` when empty).
    pub min: i64,
    /// Largest value seen (`i64::MIN` when empty).
    pub max: i64,
}

impl AggregateSnapshot {
    /// Returns the mean, or 0.0 when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// Shared read handle for [`AggregatingSink`].
#[derive(Debug, Clone)]
pub struct AggregateHandle(Arc<Mutex<AggregateState>>);

impl AggregateHandle {
    /// Returns a consistent snapshot of the aggregates.
    #[must_use]
    pub fn snapshot(&self) -> AggregateSnapshot {
        let state = self.0.lock();
        AggregateSnapshot {
            sum: state.sum,
            count: state.count,
            min: state.min,
            max: state.max,
        }
    }
}

/// Computes running sum/count/min/max over numeric payloads.
///
/// Integer payloads aggregate exactly; float payloads are truncated to
/// integers on the way in. Non-numeric payloads are ignored.
pub struct AggregatingSink {
    name: String,
    state: Arc<Mutex<AggregateState>>,
}

impl AggregatingSink {
    /// Creates an aggregating sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(AggregateState::default())),
        }
    }

    /// Returns a handle that stays readable after the sink is moved into
    /// a graph.
    #[must_use]
    pub fn aggregates(&self) -> AggregateHandle {
        AggregateHandle(Arc::clone(&self.state))
    }
}

impl Sink for AggregatingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, event: &Event) {
        let value = match event.payload() {
            Payload::Int(v) => *v,
            #[allow(clippy::cast_possible_truncation)]
            Payload::Float(v) => *v as i64,
            _ => return,
        };
        let mut state = self.state.lock();
        state.sum += value;
        state.count += 1;
        if value < state.min {
            state.min = value;
        }
        if value > state.max {
            state.max = value;
        }
    }
}

/// Logs every consumed event at debug level.
pub struct LogSink {
    name: String,
    consumed: Arc<AtomicU64>,
}

impl LogSink {
    /// Creates a logging sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns a handle to the consumed count.
    #[must_use]
    pub fn counter(&self) -> CounterHandle {
        CounterHandle(Arc::clone(&self.consumed))
    }
}

impl Sink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, event: &Event) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            sink = %self.name,
            key = ?event.key(),
            payload = ?event.payload(),
            "event consumed"
        );
    }
}

/// Runs a user closure on every consumed event.
pub struct FnSink {
    name: String,
    func: Box<dyn FnMut(&Event) + Send>,
}

impl FnSink {
    /// Creates a closure-backed sink.
    #[must_use]
    pub fn new(name: impl Into<String>, func: impl FnMut(&Event) + Send + 'static) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl Sink for FnSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&mut self, event: &Event) {
        (self.func)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_sink() {
        let mut sink = CountingSink::new("count");
        let handle = sink.counter();
        for i in 0..7i64 {
            sink.consume(&Event::new(i));
        }
        assert_eq!(handle.count(), 7);
        assert_eq!(sink.name(), "count");
    }

    #[test]
    fn test_aggregating_sink_int_and_float() {
        let mut sink = AggregatingSink::new("agg");
        let handle = sink.aggregates();
        sink.consume(&Event::new(10i64));
        sink.consume(&Event::new(-3i64));
        sink.consume(&Event::new(2.9f64)); // truncates to 2
        sink.consume(&Event::new("ignored"));

        let snap = handle.snapshot();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.sum, 9);
        assert_eq!(snap.min, -3);
        assert_eq!(snap.max, 10);
        assert!((snap.mean() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_aggregate_mean_is_zero() {
        let sink = AggregatingSink::new("agg");
        assert_eq!(sink.aggregates().snapshot().mean(), 0.0);
    }

    #[test]
    fn test_fn_sink_runs_closure() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = Arc::clone(&seen);
        let mut sink = FnSink::new("fn", move |event| {
            if event.as_int().is_some() {
                seen_clone.fetch_add(1, Ordering::Relaxed);
            }
        });
        sink.consume(&Event::new(1i64));
        sink.consume(&Event::new("text"));
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_log_sink_counts() {
        let mut sink = LogSink::new("log");
        let handle = sink.counter();
        sink.consume(&Event::new(1i64));
        assert_eq!(handle.count(), 1);
    }
}

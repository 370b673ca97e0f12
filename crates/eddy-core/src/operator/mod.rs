//! Operator contracts: the pluggable units the scheduler drives.
//!
//! Three trait shapes cover the graph:
//!
//! - [`Operator`] — one input edge, any number of output edges.
//! - [`Source`] — no input; generates events on a dedicated thread.
//! - [`Sink`] — no outputs; terminal consumer.
//!
//! Lifecycle: `init` is called exactly once after the emit context has been
//! wired and before any processing; `shutdown` exactly once after the
//! runtime stops delivering events (no emission allowed afterwards). The
//! engine guarantees that `process`/`generate` never run concurrently on
//! the same instance; see the instance claim lock.

pub mod context;
pub mod functional;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

pub use context::EmitContext;
pub use functional::{op_filter_map, op_fn, op_map_payload};

use crate::event::Event;

/// Lifecycle state of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperatorState {
    /// Constructed, not yet wired.
    Created = 0,
    /// `init` has run.
    Initialized = 1,
    /// Receiving events.
    Running = 2,
    /// Temporarily not scheduled (declared, no transition in this revision).
    Paused = 3,
    /// Shutdown in progress.
    ShuttingDown = 4,
    /// `shutdown` has run.
    Stopped = 5,
}

impl OperatorState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Initialized,
            2 => Self::Running,
            3 => Self::Paused,
            4 => Self::ShuttingDown,
            5 => Self::Stopped,
            _ => Self::Created,
        }
    }
}

/// Atomic cell holding an [`OperatorState`].
#[derive(Debug)]
pub struct AtomicOperatorState(AtomicU8);

impl AtomicOperatorState {
    /// Creates a cell in the `Created` state.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU8::new(OperatorState::Created as u8))
    }

    /// Returns the current state.
    #[must_use]
    pub fn get(&self) -> OperatorState {
        OperatorState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores a new state.
    pub fn set(&self, state: OperatorState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Default for AtomicOperatorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-operator counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct OperatorStats {
    /// Events handed to `process`/`consume`.
    pub events_received: AtomicU64,
    /// Emissions accepted by at least one output.
    pub events_emitted: AtomicU64,
    /// Events discarded (filtered out, or every output closed).
    pub events_dropped: AtomicU64,
    /// Wall time spent inside `process`, nanoseconds.
    pub processing_time_ns: AtomicU64,
    /// Emissions refused by every output (source backpressure).
    pub backpressure_events: AtomicU64,
}

impl OperatorStats {
    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> OperatorStatsSnapshot {
        OperatorStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            processing_time_ns: self.processing_time_ns.load(Ordering::Relaxed),
            backpressure_events: self.backpressure_events.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`OperatorStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorStatsSnapshot {
    /// Events handed to `process`/`consume`.
    pub events_received: u64,
    /// Emissions accepted by at least one output.
    pub events_emitted: u64,
    /// Events discarded.
    pub events_dropped: u64,
    /// Wall time spent inside `process`, nanoseconds.
    pub processing_time_ns: u64,
    /// Emissions refused by every output.
    pub backpressure_events: u64,
}

/// Cooperative stop flag shared between the runtime and a source.
///
/// The runtime requests the stop; both the source thread loop and the
/// source's own `generate` body observe it through the same token.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. One-way.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A mid-graph processing unit: one input edge, zero or more outputs.
pub trait Operator: Send {
    /// Operator name; unique within a graph.
    fn name(&self) -> &str;

    /// Called once after the context has been wired, before any `process`.
    fn init(&mut self, ctx: &mut EmitContext) {
        let _ = ctx;
    }

    /// Processes one event. Emit zero or more results via `ctx`.
    fn process(&mut self, event: Event, ctx: &mut EmitContext);

    /// Periodic hook for time-based operators.
    fn on_timer(&mut self, ctx: &mut EmitContext) {
        let _ = ctx;
    }

    /// Called once when processing stops. No emission after return.
    fn shutdown(&mut self, ctx: &mut EmitContext) {
        let _ = ctx;
    }
}

/// An event producer. Sources run on dedicated threads, never on workers.
pub trait Source: Send {
    /// Source name; unique within a graph.
    fn name(&self) -> &str;

    /// Called once before generation starts.
    fn init(&mut self, ctx: &mut EmitContext) {
        let _ = ctx;
    }

    /// Produces at most one event per call.
    ///
    /// Returns `true` to be called again, `false` for end-of-stream.
    /// Implementations must consult [`EmitContext::stop_requested`] and
    /// return `false` once a stop has been requested.
    fn generate(&mut self, ctx: &mut EmitContext) -> bool;

    /// Called once when the source thread has exited.
    fn shutdown(&mut self, ctx: &mut EmitContext) {
        let _ = ctx;
    }
}

/// A terminal consumer. Sinks must not emit.
pub trait Sink: Send {
    /// Sink name; unique within a graph.
    fn name(&self) -> &str;

    /// Called once before consumption starts.
    fn init(&mut self) {}

    /// Consumes one event.
    fn consume(&mut self, event: &Event);

    /// Called once when consumption stops.
    fn shutdown(&mut self) {}
}

/// The kinds of node a graph can hold.
///
/// Sinks are adapted to the [`Operator`] capability at materialization
/// time so the scheduler only ever sees operators.
pub enum OperatorKind {
    /// Mid-graph operator.
    Transform(Box<dyn Operator>),
    /// Event producer.
    Source(Box<dyn Source>),
    /// Terminal consumer.
    Sink(Box<dyn Sink>),
}

impl OperatorKind {
    /// Returns the node's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            OperatorKind::Transform(op) => op.name(),
            OperatorKind::Source(src) => src.name(),
            OperatorKind::Sink(sink) => sink.name(),
        }
    }

    /// Returns `true` for the source variant.
    #[must_use]
    pub fn is_source(&self) -> bool {
        matches!(self, OperatorKind::Source(_))
    }

    /// Returns `true` for the sink variant.
    #[must_use]
    pub fn is_sink(&self) -> bool {
        matches!(self, OperatorKind::Sink(_))
    }
}

impl std::fmt::Debug for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            OperatorKind::Transform(_) => "Transform",
            OperatorKind::Source(_) => "Source",
            OperatorKind::Sink(_) => "Sink",
        };
        f.debug_struct("OperatorKind")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish()
    }
}

/// Adapts a [`Sink`] to the [`Operator`] capability: `process` delegates
/// to `consume` and never emits.
pub struct SinkAdapter {
    sink: Box<dyn Sink>,
}

impl SinkAdapter {
    /// Wraps a sink.
    #[must_use]
    pub fn new(sink: Box<dyn Sink>) -> Self {
        Self { sink }
    }
}

impl Operator for SinkAdapter {
    fn name(&self) -> &str {
        self.sink.name()
    }

    fn init(&mut self, _ctx: &mut EmitContext) {
        self.sink.init();
    }

    fn process(&mut self, event: Event, _ctx: &mut EmitContext) {
        self.sink.consume(&event);
    }

    fn shutdown(&mut self, _ctx: &mut EmitContext) {
        self.sink.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        seen: Arc<parking_lot::Mutex<Vec<i64>>>,
    }

    impl RecordingSink {
        fn new() -> (Self, Arc<parking_lot::Mutex<Vec<i64>>>) {
            let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
            (
                Self {
                    seen: Arc::clone(&seen),
                },
                seen,
            )
        }
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn consume(&mut self, event: &Event) {
            if let Some(v) = event.as_int() {
                self.seen.lock().push(v);
            }
        }
    }

    #[test]
    fn test_stop_token() {
        let token = StopToken::new();
        let observer = token.clone();
        assert!(!observer.is_requested());
        token.request();
        assert!(observer.is_requested());
    }

    #[test]
    fn test_atomic_state_round_trip() {
        let state = AtomicOperatorState::new();
        assert_eq!(state.get(), OperatorState::Created);
        state.set(OperatorState::Running);
        assert_eq!(state.get(), OperatorState::Running);
        state.set(OperatorState::Stopped);
        assert_eq!(state.get(), OperatorState::Stopped);
    }

    #[test]
    fn test_operator_stats_snapshot() {
        let stats = OperatorStats::default();
        stats.events_received.fetch_add(3, Ordering::Relaxed);
        stats.events_dropped.fetch_add(1, Ordering::Relaxed);
        let snap = stats.snapshot();
        assert_eq!(snap.events_received, 3);
        assert_eq!(snap.events_dropped, 1);
        assert_eq!(snap.events_emitted, 0);
    }

    #[test]
    fn test_sink_adapter_delegates() {
        let (sink, seen) = RecordingSink::new();
        let mut adapter = SinkAdapter::new(Box::new(sink));
        let mut ctx = EmitContext::new("recording", 0);
        adapter.process(Event::new(5i64), &mut ctx);
        adapter.process(Event::new(9i64), &mut ctx);
        assert_eq!(adapter.name(), "recording");
        assert_eq!(*seen.lock(), vec![5, 9]);
    }

    #[test]
    fn test_operator_kind_names() {
        let (sink, _seen) = RecordingSink::new();
        let kind = OperatorKind::Sink(Box::new(sink));
        assert_eq!(kind.name(), "recording");
        assert!(kind.is_sink());
        assert!(!kind.is_source());
    }
}

//! Executable realizations of graph nodes.
//!
//! [`OperatorInstance`] binds an operator to its shared input queue and
//! its emit context; it is what the scheduler hands to workers.
//! [`SourceInstance`] is the equivalent wrapper for sources, owned by a
//! dedicated thread rather than scheduled.
//!
//! # Single-worker invariant
//!
//! Two workers must never run `process` on the same instance at once, and
//! a ready instance must process its queue in FIFO order. Both follow
//! from the claim lock: [`OperatorInstance::execute_batch`] takes the
//! instance mutex with `try_lock` and returns 0 on contention, so a
//! losing worker simply asks the scheduler for other work. Pops happen
//! under the claim, which serializes them with processing.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::operator::{
    AtomicOperatorState, EmitContext, Operator, OperatorState, OperatorStats, Source, StopToken,
};
use crate::queue::BoundedQueue;

/// Default number of events a worker drains from an instance per visit.
pub const DEFAULT_BATCH_SIZE: usize = 64;

struct InstanceCore {
    op: Box<dyn Operator>,
    ctx: EmitContext,
}

/// One executable realization of a non-source operator.
pub struct OperatorInstance {
    name: String,
    instance_id: u32,
    input: Option<Arc<BoundedQueue>>,
    stats: Arc<OperatorStats>,
    state: AtomicOperatorState,
    core: Mutex<InstanceCore>,
}

impl OperatorInstance {
    /// Creates an instance from an operator, its input queue, and a wired
    /// emit context. The context must share `stats`.
    #[must_use]
    pub fn new(
        op: Box<dyn Operator>,
        input: Option<Arc<BoundedQueue>>,
        ctx: EmitContext,
        stats: Arc<OperatorStats>,
    ) -> Self {
        Self {
            name: op.name().to_string(),
            instance_id: ctx.instance_id(),
            input,
            stats,
            state: AtomicOperatorState::new(),
            core: Mutex::new(InstanceCore { op, ctx }),
        }
    }

    /// Returns the operator name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instance id.
    #[inline]
    #[must_use]
    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// Returns the input queue, if the operator has one.
    #[must_use]
    pub fn input(&self) -> Option<&Arc<BoundedQueue>> {
        self.input.as_ref()
    }

    /// Returns the shared stats block.
    #[must_use]
    pub fn stats(&self) -> &Arc<OperatorStats> {
        &self.stats
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> OperatorState {
        self.state.get()
    }

    /// Sets the lifecycle state.
    pub fn set_state(&self, state: OperatorState) {
        self.state.set(state);
    }

    /// Returns `true` if the input queue holds events.
    ///
    /// This is the scheduler's readiness predicate; instances without an
    /// input queue are never ready.
    #[must_use]
    pub fn has_work(&self) -> bool {
        self.input.as_ref().is_some_and(|q| !q.is_empty())
    }

    /// Runs the operator's `init` hook.
    pub fn init(&self) {
        let mut core = self.core.lock();
        let InstanceCore { op, ctx } = &mut *core;
        op.init(ctx);
        self.state.set(OperatorState::Initialized);
    }

    /// Runs the operator's `shutdown` hook.
    pub fn shutdown(&self) {
        self.state.set(OperatorState::ShuttingDown);
        let mut core = self.core.lock();
        let InstanceCore { op, ctx } = &mut *core;
        op.shutdown(ctx);
        drop(core);
        self.state.set(OperatorState::Stopped);
    }

    /// Runs the operator's `on_timer` hook, if the instance is unclaimed.
    pub fn fire_timer(&self) {
        if let Some(mut core) = self.core.try_lock() {
            let InstanceCore { op, ctx } = &mut *core;
            op.on_timer(ctx);
        }
    }

    /// Processes at most one event. Returns `true` if work was done.
    pub fn execute_once(&self) -> bool {
        self.execute_batch(1) == 1
    }

    /// Claims the instance and drains up to `max_batch` events from the
    /// input queue through `process`.
    ///
    /// Returns the number of events processed: 0 when there is no input
    /// queue, the queue is empty, or another worker holds the claim.
    pub fn execute_batch(&self, max_batch: usize) -> usize {
        let Some(input) = self.input.as_ref() else {
            return 0;
        };
        // The claim: losing the race is not an error, the other worker is
        // already draining this instance.
        let Some(mut core) = self.core.try_lock() else {
            return 0;
        };
        let InstanceCore { op, ctx } = &mut *core;

        let mut processed = 0;
        while processed < max_batch {
            let Some(event) = input.try_pop() else {
                break;
            };
            self.stats
                .events_received
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let started = Instant::now();
            op.process(event, ctx);
            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ns = started.elapsed().as_nanos() as u64;
            self.stats
                .processing_time_ns
                .fetch_add(elapsed_ns, std::sync::atomic::Ordering::Relaxed);
            processed += 1;
        }
        processed
    }
}

/// One executable realization of a source, driven by a dedicated thread.
pub struct SourceInstance {
    name: String,
    op: Box<dyn Source>,
    ctx: EmitContext,
    stop: StopToken,
    stats: Arc<OperatorStats>,
    state: AtomicOperatorState,
}

impl SourceInstance {
    /// Creates a source instance. The context must share `stats` and
    /// `stop`.
    #[must_use]
    pub fn new(
        op: Box<dyn Source>,
        ctx: EmitContext,
        stop: StopToken,
        stats: Arc<OperatorStats>,
    ) -> Self {
        Self {
            name: op.name().to_string(),
            op,
            ctx,
            stop,
            stats,
            state: AtomicOperatorState::new(),
        }
    }

    /// Returns the source name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared stats block.
    #[must_use]
    pub fn stats(&self) -> &Arc<OperatorStats> {
        &self.stats
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> OperatorState {
        self.state.get()
    }

    /// Sets the lifecycle state.
    pub fn set_state(&self, state: OperatorState) {
        self.state.set(state);
    }

    /// Returns a clone of the stop token.
    #[must_use]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Returns `true` once a stop has been requested.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.is_requested()
    }

    /// Runs the source's `init` hook.
    pub fn init(&mut self) {
        self.op.init(&mut self.ctx);
        self.state.set(OperatorState::Initialized);
    }

    /// Runs one generation step. Returns `false` at end-of-stream.
    pub fn generate(&mut self) -> bool {
        self.op.generate(&mut self.ctx)
    }

    /// Closes all output queues, signalling end-of-stream downstream.
    pub fn close_outputs(&self) {
        self.ctx.close_outputs();
    }

    /// Runs the source's `shutdown` hook.
    pub fn shutdown(&mut self) {
        self.state.set(OperatorState::ShuttingDown);
        self.op.shutdown(&mut self.ctx);
        self.state.set(OperatorState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::operator::op_map_payload;
    use crate::Payload;
    use std::thread;

    fn doubling_instance(
        input: &Arc<BoundedQueue>,
        output: &Arc<BoundedQueue>,
    ) -> OperatorInstance {
        let stats = Arc::new(OperatorStats::default());
        let mut ctx = EmitContext::new("double", 1).with_stats(Arc::clone(&stats));
        ctx.add_output(Arc::clone(output));
        let op = op_map_payload("double", |e: &Event| {
            Payload::Int(e.as_int().map_or(0, |v| v * 2))
        });
        OperatorInstance::new(op, Some(Arc::clone(input)), ctx, stats)
    }

    #[test]
    fn test_execute_batch_drains_up_to_limit() {
        let input = Arc::new(BoundedQueue::new(64));
        let output = Arc::new(BoundedQueue::new(64));
        let instance = doubling_instance(&input, &output);

        for i in 0..10i64 {
            input.push(Event::new(i));
        }
        assert!(instance.has_work());
        assert_eq!(instance.execute_batch(4), 4);
        assert_eq!(input.len(), 6);
        assert_eq!(output.len(), 4);
        assert_eq!(instance.execute_batch(64), 6);
        assert!(!instance.has_work());
        assert_eq!(instance.stats().snapshot().events_received, 10);
    }

    #[test]
    fn test_execute_batch_preserves_fifo() {
        let input = Arc::new(BoundedQueue::new(64));
        let output = Arc::new(BoundedQueue::new(64));
        let instance = doubling_instance(&input, &output);
        for i in 0..5i64 {
            input.push(Event::new(i));
        }
        instance.execute_batch(64);
        for i in 0..5i64 {
            assert_eq!(output.try_pop().and_then(|e| e.as_int()), Some(i * 2));
        }
    }

    #[test]
    fn test_no_input_queue_means_no_work() {
        let stats = Arc::new(OperatorStats::default());
        let ctx = EmitContext::new("headless", 0).with_stats(Arc::clone(&stats));
        let op = op_map_payload("headless", |e: &Event| e.payload().clone());
        let instance = OperatorInstance::new(op, None, ctx, stats);
        assert!(!instance.has_work());
        assert_eq!(instance.execute_batch(64), 0);
    }

    #[test]
    fn test_claim_excludes_second_worker() {
        let input = Arc::new(BoundedQueue::new(1024));
        let output = Arc::new(BoundedQueue::new(1024));
        let instance = Arc::new(doubling_instance(&input, &output));
        for i in 0..512i64 {
            input.push(Event::new(i));
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let inst = Arc::clone(&instance);
            handles.push(thread::spawn(move || {
                let mut total = 0;
                loop {
                    let n = inst.execute_batch(32);
                    total += n;
                    if !inst.has_work() {
                        break;
                    }
                }
                total
            }));
        }
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 512);

        // FIFO held across the contended claims.
        for i in 0..512i64 {
            assert_eq!(output.try_pop().and_then(|e| e.as_int()), Some(i * 2));
        }
    }

    #[test]
    fn test_execute_once() {
        let input = Arc::new(BoundedQueue::new(8));
        let output = Arc::new(BoundedQueue::new(8));
        let instance = doubling_instance(&input, &output);
        assert!(!instance.execute_once());
        input.push(Event::new(21i64));
        assert!(instance.execute_once());
        assert_eq!(output.try_pop().and_then(|e| e.as_int()), Some(42));
    }

    #[test]
    fn test_fire_timer_reaches_operator() {
        struct TickOperator {
            ticks: Arc<std::sync::atomic::AtomicU64>,
        }
        impl crate::operator::Operator for TickOperator {
            fn name(&self) -> &str {
                "ticker"
            }
            fn process(&mut self, _event: Event, _ctx: &mut EmitContext) {}
            fn on_timer(&mut self, _ctx: &mut EmitContext) {
                self.ticks.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }

        let ticks = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let stats = Arc::new(OperatorStats::default());
        let ctx = EmitContext::new("ticker", 0).with_stats(Arc::clone(&stats));
        let instance = OperatorInstance::new(
            Box::new(TickOperator {
                ticks: Arc::clone(&ticks),
            }),
            None,
            ctx,
            stats,
        );
        instance.fire_timer();
        instance.fire_timer();
        assert_eq!(ticks.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn test_lifecycle_state_transitions() {
        let input = Arc::new(BoundedQueue::new(8));
        let output = Arc::new(BoundedQueue::new(8));
        let instance = doubling_instance(&input, &output);
        assert_eq!(instance.state(), OperatorState::Created);
        instance.init();
        assert_eq!(instance.state(), OperatorState::Initialized);
        instance.set_state(OperatorState::Running);
        instance.shutdown();
        assert_eq!(instance.state(), OperatorState::Stopped);
    }
}

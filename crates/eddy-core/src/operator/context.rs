//! Emission context: fan-out routing under backpressure.
//!
//! Each operator instance owns one [`EmitContext`] holding shared handles
//! to its output queues, in edge-declaration order. Blocking emission is
//! what propagates backpressure: a full downstream queue stalls the
//! emitting operator inside its `process` call, which stops it draining
//! its own input, and so on back to the source.

use std::sync::Arc;

use crate::operator::{OperatorStats, StopToken};
use crate::queue::BoundedQueue;
use crate::Event;

/// Context handed to an operator for emitting output.
///
/// Carries the owning operator's name and instance id, the ordered output
/// queues, the shared stats block, and (for sources) the stop token.
pub struct EmitContext {
    name: String,
    instance_id: u32,
    outputs: Vec<Arc<BoundedQueue>>,
    stats: Arc<OperatorStats>,
    stop: StopToken,
}

impl EmitContext {
    /// Creates a context with no outputs and fresh stats.
    #[must_use]
    pub fn new(name: impl Into<String>, instance_id: u32) -> Self {
        Self {
            name: name.into(),
            instance_id,
            outputs: Vec::new(),
            stats: Arc::new(OperatorStats::default()),
            stop: StopToken::new(),
        }
    }

    /// Installs a shared stats block (wiring time only).
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<OperatorStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Installs a shared stop token (wiring time only).
    #[must_use]
    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    /// Appends an output queue. Order of calls is emission order.
    pub fn add_output(&mut self, queue: Arc<BoundedQueue>) {
        self.outputs.push(queue);
    }

    /// Returns the owning operator's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning instance id.
    #[inline]
    #[must_use]
    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// Returns the number of output edges.
    #[inline]
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Returns the output queues in emission order.
    #[must_use]
    pub fn outputs(&self) -> &[Arc<BoundedQueue>] {
        &self.outputs
    }

    /// Returns the shared stats block.
    #[must_use]
    pub fn stats(&self) -> &Arc<OperatorStats> {
        &self.stats
    }

    /// Returns `true` once the runtime has requested this operator's
    /// source to stop. Always `false` for non-source operators.
    #[inline]
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    /// Emits an event to every output in declaration order with blocking
    /// pushes.
    ///
    /// The event is cloned for each output except the last, which receives
    /// it by move. Returns the number of outputs that accepted it; a count
    /// below `output_count()` means at least one output was closed. When
    /// every output is closed the event counts as dropped.
    pub fn emit(&mut self, event: Event) -> usize {
        self.emit_with(event, BoundedQueue::push)
    }

    /// Emits with non-blocking pushes; otherwise identical to [`emit`].
    ///
    /// [`emit`]: EmitContext::emit
    pub fn try_emit(&mut self, event: Event) -> usize {
        self.emit_with(event, BoundedQueue::try_push)
    }

    fn emit_with(&mut self, event: Event, push: impl Fn(&BoundedQueue, Event) -> bool) -> usize {
        let count = self.outputs.len();
        if count == 0 {
            return 0;
        }
        let mut accepted = 0;
        for queue in &self.outputs[..count - 1] {
            if push(queue, event.clone()) {
                accepted += 1;
            }
        }
        if push(&self.outputs[count - 1], event) {
            accepted += 1;
        }
        if accepted > 0 {
            self.stats
                .events_emitted
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        } else {
            self.record_dropped();
        }
        accepted
    }

    /// Records a source emission refused by every output.
    pub fn record_backpressure(&self) {
        self.stats
            .backpressure_events
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Records an explicitly discarded event.
    pub fn record_dropped(&self) {
        self.stats
            .events_dropped
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Closes every output queue. Used by the runtime when a source
    /// exhausts naturally, signalling end-of-stream downstream.
    pub fn close_outputs(&self) {
        for queue in &self.outputs {
            queue.close();
        }
    }
}

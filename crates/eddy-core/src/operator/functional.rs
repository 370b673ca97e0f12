//! Closure-backed operators.
//!
//! Three accepted callable shapes, one constructor each (no overload
//! machinery — the shape is picked by the caller, not inferred):
//!
//! 1. [`op_fn`] — `(event, ctx)`; the closure emits whatever it wants.
//! 2. [`op_filter_map`] — `(&event) -> Option<Event>`; emit on `Some`.
//! 3. [`op_map_payload`] — `(&event) -> Payload`; emit a new event with
//!    the returned payload and the original metadata.

use crate::event::{Event, Payload};
use crate::operator::{EmitContext, Operator};

struct FnOperator<F> {
    name: String,
    func: F,
}

impl<F> Operator for FnOperator<F>
where
    F: FnMut(Event, &mut EmitContext) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, event: Event, ctx: &mut EmitContext) {
        (self.func)(event, ctx);
    }
}

struct FilterMapOperator<F> {
    name: String,
    func: F,
}

impl<F> Operator for FilterMapOperator<F>
where
    F: FnMut(&Event) -> Option<Event> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, event: Event, ctx: &mut EmitContext) {
        match (self.func)(&event) {
            Some(out) => {
                ctx.emit(out);
            }
            None => ctx.record_dropped(),
        }
    }
}

struct MapPayloadOperator<F> {
    name: String,
    func: F,
}

impl<F> Operator for MapPayloadOperator<F>
where
    F: FnMut(&Event) -> Payload + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, event: Event, ctx: &mut EmitContext) {
        let payload = (self.func)(&event);
        let (_, metadata) = event.into_parts();
        ctx.emit(Event::from_parts(payload, metadata));
    }
}

/// Operator from a `(event, ctx)` closure that emits via the context.
pub fn op_fn<F>(name: impl Into<String>, func: F) -> Box<dyn Operator>
where
    F: FnMut(Event, &mut EmitContext) + Send + 'static,
{
    Box::new(FnOperator {
        name: name.into(),
        func,
    })
}

/// Operator from a `(&event) -> Option<Event>` closure; `None` drops.
pub fn op_filter_map<F>(name: impl Into<String>, func: F) -> Box<dyn Operator>
where
    F: FnMut(&Event) -> Option<Event> + Send + 'static,
{
    Box::new(FilterMapOperator {
        name: name.into(),
        func,
    })
}

/// Operator from a `(&event) -> Payload` closure; the result is emitted
/// with the input event's metadata.
pub fn op_map_payload<F>(name: impl Into<String>, func: F) -> Box<dyn Operator>
where
    F: FnMut(&Event) -> Payload + Send + 'static,
{
    Box::new(MapPayloadOperator {
        name: name.into(),
        func,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::BoundedQueue;
    use std::sync::Arc;

    fn wired_ctx(queue: &Arc<BoundedQueue>) -> EmitContext {
        let mut ctx = EmitContext::new("test", 0);
        ctx.add_output(Arc::clone(queue));
        ctx
    }

    #[test]
    fn test_op_fn_emits_through_context() {
        let queue = Arc::new(BoundedQueue::new(8));
        let mut ctx = wired_ctx(&queue);
        let mut op = op_fn("duplicate", |event: Event, ctx: &mut EmitContext| {
            ctx.emit(event.clone());
            ctx.emit(event);
        });
        op.process(Event::new(3i64), &mut ctx);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_op_filter_map_some_emits() {
        let queue = Arc::new(BoundedQueue::new(8));
        let mut ctx = wired_ctx(&queue);
        let mut op = op_filter_map("keep-even", |event: &Event| {
            event.as_int().filter(|v| v % 2 == 0).map(Event::new)
        });
        op.process(Event::new(2i64), &mut ctx);
        op.process(Event::new(3i64), &mut ctx);
        assert_eq!(queue.len(), 1);
        assert_eq!(ctx.stats().snapshot().events_dropped, 1);
    }

    #[test]
    fn test_op_map_payload_keeps_metadata() {
        let queue = Arc::new(BoundedQueue::new(8));
        let mut ctx = wired_ctx(&queue);
        let mut op = op_map_payload("square", |event: &Event| {
            Payload::Int(event.as_int().map_or(0, |v| v * v))
        });
        op.process(Event::with_key(6i64, 99), &mut ctx);
        let out = queue.try_pop().expect("event expected");
        assert_eq!(out.as_int(), Some(36));
        assert_eq!(out.key(), Some(99));
    }
}

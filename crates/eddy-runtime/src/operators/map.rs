//! Map operator constructors.
//!
//! Typed conveniences over the engine's payload-map shape: a payload of
//! the wrong type passes through unchanged rather than being dropped, so
//! a graph can carry mixed payloads past a typed map.

use eddy_core::event::Payload;
use eddy_core::operator::{op_map_payload, Operator};

/// Operator applying `func` to every payload.
pub fn map(
    name: impl Into<String>,
    mut func: impl FnMut(&Payload) -> Payload + Send + 'static,
) -> Box<dyn Operator> {
    op_map_payload(name, move |event| func(event.payload()))
}

/// Operator applying `func` to integer payloads; other payloads pass
/// through unchanged.
pub fn map_int(
    name: impl Into<String>,
    mut func: impl FnMut(i64) -> i64 + Send + 'static,
) -> Box<dyn Operator> {
    map(name, move |payload| match payload {
        Payload::Int(v) => Payload::Int(func(*v)),
        other => other.clone(),
    })
}

/// Operator applying `func` to float payloads; other payloads pass
/// through unchanged.
pub fn map_float(
    name: impl Into<String>,
    mut func: impl FnMut(f64) -> f64 + Send + 'static,
) -> Box<dyn Operator> {
    map(name, move |payload| match payload {
        Payload::Float(v) => Payload::Float(func(*v)),
        other => other.clone(),
    })
}

/// Operator applying `func` to text payloads; other payloads pass
/// through unchanged.
pub fn map_text(
    name: impl Into<String>,
    mut func: impl FnMut(&str) -> String + Send + 'static,
) -> Box<dyn Operator> {
    map(name, move |payload| match payload {
        Payload::Text(s) => Payload::Text(func(s)),
        other => other.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::event::Event;
    use eddy_core::operator::EmitContext;
    use eddy_core::queue::BoundedQueue;
    use std::sync::Arc;

    fn run_through(op: &mut Box<dyn Operator>, event: Event) -> Option<Event> {
        let queue = Arc::new(BoundedQueue::new(4));
        let mut ctx = EmitContext::new("test", 0);
        ctx.add_output(Arc::clone(&queue));
        op.process(event, &mut ctx);
        queue.try_pop()
    }

    #[test]
    fn test_map_int_squares() {
        let mut op = map_int("square", |v| v * v);
        let out = run_through(&mut op, Event::new(9i64)).expect("event expected");
        assert_eq!(out.as_int(), Some(81));
    }

    #[test]
    fn test_map_int_passes_other_payloads() {
        let mut op = map_int("square", |v| v * v);
        let out = run_through(&mut op, Event::new("text")).expect("event expected");
        assert_eq!(out.as_text(), Some("text"));
    }

    #[test]
    fn test_map_float() {
        let mut op = map_float("half", |v| v / 2.0);
        let out = run_through(&mut op, Event::new(3.0f64)).expect("event expected");
        assert_eq!(out.as_float(), Some(1.5));
    }

    #[test]
    fn test_map_text() {
        let mut op = map_text("upper", |s| s.to_uppercase());
        let out = run_through(&mut op, Event::new("abc")).expect("event expected");
        assert_eq!(out.as_text(), Some("ABC"));
    }

    #[test]
    fn test_map_preserves_key() {
        let mut op = map_int("inc", |v| v + 1);
        let out = run_through(&mut op, Event::with_key(1i64, 42)).expect("event expected");
        assert_eq!(out.key(), Some(42));
        assert_eq!(out.as_int(), Some(2));
    }
}

//! Filter operator constructors and stock predicates.

use eddy_core::event::Payload;
use eddy_core::operator::{op_fn, Operator};

/// Operator passing events whose payload satisfies `pred`; the rest are
/// dropped and counted.
pub fn filter(
    name: impl Into<String>,
    mut pred: impl FnMut(&Payload) -> bool + Send + 'static,
) -> Box<dyn Operator> {
    op_fn(name, move |event, ctx| {
        if pred(event.payload()) {
            ctx.emit(event);
        } else {
            ctx.record_dropped();
        }
    })
}

/// Filter over integer payloads; non-integers are dropped.
pub fn filter_int(
    name: impl Into<String>,
    mut pred: impl FnMut(i64) -> bool + Send + 'static,
) -> Box<dyn Operator> {
    filter(name, move |payload| match payload {
        Payload::Int(v) => pred(*v),
        _ => false,
    })
}

/// Stock payload predicates for use with [`filter`].
pub mod predicates {
    use super::Payload;

    /// Even integers.
    pub fn even() -> impl FnMut(&Payload) -> bool {
        |payload| matches!(payload, Payload::Int(v) if v % 2 == 0)
    }

    /// Odd integers.
    pub fn odd() -> impl FnMut(&Payload) -> bool {
        |payload| matches!(payload, Payload::Int(v) if v % 2 != 0)
    }

    /// Strictly positive numbers (int or float).
    pub fn positive() -> impl FnMut(&Payload) -> bool {
        |payload| match payload {
            Payload::Int(v) => *v > 0,
            Payload::Float(v) => *v > 0.0,
            _ => false,
        }
    }

    /// Strictly negative numbers (int or float).
    pub fn negative() -> impl FnMut(&Payload) -> bool {
        |payload| match payload {
            Payload::Int(v) => *v < 0,
            Payload::Float(v) => *v < 0.0,
            _ => false,
        }
    }

    /// Numbers within `[min, max]` (int or float).
    #[allow(clippy::cast_precision_loss)]
    pub fn in_range(min: i64, max: i64) -> impl FnMut(&Payload) -> bool {
        move |payload| match payload {
            Payload::Int(v) => *v >= min && *v <= max,
            Payload::Float(v) => *v >= min as f64 && *v <= max as f64,
            _ => false,
        }
    }
}

//! Built-in operators: sources, sinks, and transform constructors.
//!
//! Everything here is implemented against the public operator contracts
//! in `eddy-core`; user code is expected to define its own operators the
//! same way.

pub mod filter;
pub mod map;
pub mod sink;
pub mod source;

pub use filter::{filter, filter_int, predicates};
pub use map::{map, map_float, map_int, map_text};
pub use sink::{
    AggregateHandle, AggregateSnapshot, AggregatingSink, CounterHandle, CountingSink, FnSink,
    LogSink, NullSink,
};
pub use source::{FnSource, RandomConfig, RandomSource, SequenceConfig, SequenceSource};

//! # eddy-runtime
//!
//! Graph construction and lifecycle coordination for the eddy
//! stream-processing engine. Declare a dataflow graph with
//! [`GraphBuilder`], hand it to a [`Runtime`], and the runtime
//! materializes one bounded queue per edge, wraps every node in an
//! executable instance, and drives the whole thing with a worker pool
//! plus one dedicated thread per source.
//!
//! ```no_run
//! use eddy_runtime::{GraphBuilder, Runtime, RuntimeConfig};
//! use eddy_runtime::operators::{filter, map_int, predicates, AggregatingSink, SequenceSource};
//!
//! let sink = AggregatingSink::new("aggregate");
//! let aggregates = sink.aggregates();
//!
//! let graph = GraphBuilder::new()
//!     .add_source(Box::new(SequenceSource::from_range("numbers", 1, 20)))
//!     .add_operator(map_int("square", |x| x * x))
//!     .add_operator(filter("even", predicates::even()))
//!     .add_sink(Box::new(sink))
//!     .connect("numbers", "square")
//!     .connect("square", "even")
//!     .connect("even", "aggregate");
//!
//! let mut runtime = Runtime::new(RuntimeConfig::default());
//! runtime.init(graph)?;
//! runtime.start()?;
//! runtime.await_completion();
//! runtime.stop();
//!
//! let snapshot = aggregates.snapshot();
//! assert_eq!(snapshot.count, 10);
//! assert_eq!(snapshot.sum, 1540);
//! # Ok::<(), eddy_runtime::RuntimeError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod graph;
pub mod operators;
pub mod runtime;

pub use config::{RuntimeConfig, RuntimeConfigBuilder};
pub use error::RuntimeError;
pub use graph::{Edge, GraphBuilder};
pub use runtime::{Runtime, RuntimeState};

// The engine types users touch when writing operators.
pub use eddy_core::event::{Event, EventKey, EventMetadata, Payload, SequenceNumber, StreamItem};
pub use eddy_core::operator::{
    op_filter_map, op_fn, op_map_payload, EmitContext, Operator, Sink, Source,
};
pub use eddy_core::scheduler::SchedulingPolicy;

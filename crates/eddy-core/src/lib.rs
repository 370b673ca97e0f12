//! # eddy-core
//!
//! Execution engine for the eddy stream-processing runtime: a single-node,
//! in-process dataflow engine with bounded queues, cooperative scheduling
//! across a worker pool, and end-to-end backpressure. No broker, no
//! network, no persistence — sources and sinks run inside the process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐  queue   ┌──────────┐  queue   ┌─────────┐
//! │ Source   │ ───────▶ │ Operator  │ ───────▶ │ Sink     │
//! │ (thread) │          │ (workers) │          │ (workers)│
//! └─────────┘          └──────────┘          └─────────┘
//! ```
//!
//! - [`event`] — the unit of flow.
//! - [`queue`] — bounded MPMC channel; one per graph edge.
//! - [`operator`] — operator/source/sink contracts and the emit context.
//! - [`instance`] — operators bound to their queues, with the
//!   single-worker claim.
//! - [`scheduler`] — round-robin and work-stealing instance selection.
//! - [`worker`] — the thread pool driving the scheduler.
//! - [`metrics`] — advisory counters consumed by the runtime.
//!
//! Graph construction and lifecycle coordination live in the companion
//! `eddy-runtime` crate.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod event;
pub mod instance;
pub mod metrics;
pub mod operator;
pub mod queue;
pub mod scheduler;
pub mod worker;

pub use event::{Event, EventKey, EventMetadata, Payload, SequenceNumber, StreamItem};
pub use instance::{OperatorInstance, SourceInstance, DEFAULT_BATCH_SIZE};
pub use metrics::{Counter, Gauge, LatencyHistogram, MetricsCollector, RuntimeMetricsSnapshot};
pub use operator::{
    op_filter_map, op_fn, op_map_payload, EmitContext, Operator, OperatorKind, OperatorState,
    OperatorStats, OperatorStatsSnapshot, Sink, SinkAdapter, Source, StopToken,
};
pub use queue::{BoundedQueue, QueueStats};
pub use scheduler::{
    create_scheduler, RoundRobinScheduler, Scheduler, SchedulerStatsSnapshot, SchedulingPolicy,
    WorkStealingScheduler,
};
pub use worker::{WorkerPool, WorkerStats, WorkerStatsSnapshot};

//! Source → square → even-filter → aggregate, end to end.
//!
//! Run with logging to watch the runtime's lifecycle and periodic
//! metrics:
//!
//! ```sh
//! RUST_LOG=debug cargo run --example simple_pipeline
//! ```

use std::time::Duration;

use eddy_runtime::operators::{
    filter, map_int, predicates, AggregatingSink, SequenceConfig, SequenceSource,
};
use eddy_runtime::{GraphBuilder, Runtime, RuntimeConfig, RuntimeError, SchedulingPolicy};

fn main() -> Result<(), RuntimeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let source = SequenceSource::new(
        "numbers",
        SequenceConfig {
            start: 1,
            step: 1,
            count: 100_000,
            delay: Duration::from_micros(10),
        },
    );
    let sink = AggregatingSink::new("aggregate");
    let aggregates = sink.aggregates();

    let graph = GraphBuilder::new()
        .add_source(Box::new(source))
        .add_operator(map_int("square", |x| x * x))
        .add_operator(filter("even", predicates::even()))
        .add_sink(Box::new(sink))
        .connect("numbers", "square")
        .connect("square", "even")
        .connect("even", "aggregate");

    let config = RuntimeConfig::builder()
        .num_workers(4)
        .scheduling_policy(SchedulingPolicy::RoundRobin)
        .metrics_interval(Duration::from_secs(1))
        .build();

    let mut runtime = Runtime::new(config);
    runtime.init(graph)?;
    runtime.start()?;

    runtime.await_completion();
    runtime.stop();

    let snapshot = aggregates.snapshot();
    let metrics = runtime.metrics_snapshot();
    tracing::info!(
        aggregated = snapshot.count,
        sum = snapshot.sum,
        mean = snapshot.mean(),
        min = snapshot.min,
        max = snapshot.max,
        uptime_ms = metrics.uptime.as_millis() as u64,
        "pipeline finished"
    );

    Ok(())
}

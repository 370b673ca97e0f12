//! Stream graph declaration.
//!
//! A [`GraphBuilder`] collects named nodes (sources, operators, sinks)
//! and the edges between them, then hands the whole description to
//! [`Runtime::init`](crate::Runtime::init) for materialization. Nodes are
//! identified by name; every edge becomes exactly one bounded queue.
//!
//! Validation happens at `init`, not while building, so declaration order
//! doesn't matter: connect first, add later, or the other way round.

use rustc_hash::{FxHashMap, FxHashSet};

use eddy_core::operator::{Operator, OperatorKind, Sink, Source};

use crate::error::RuntimeError;

/// A directed connection between two named operators.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Upstream operator name.
    pub from: String,
    /// Downstream operator name.
    pub to: String,
    /// Queue capacity; `None` uses the runtime default.
    pub capacity: Option<usize>,
}

/// Builder for a stream graph.
///
/// # Example
///
/// ```
/// use eddy_runtime::graph::GraphBuilder;
/// use eddy_runtime::operators::{filter_int, map_int, CountingSink, SequenceSource};
///
/// let sink = CountingSink::new("count");
/// let graph = GraphBuilder::new()
///     .add_source(Box::new(SequenceSource::from_range("nums", 1, 100)))
///     .add_operator(map_int("double", |v| v * 2))
///     .add_operator(filter_int("big", |v| v > 50))
///     .add_sink(Box::new(sink))
///     .connect("nums", "double")
///     .connect("double", "big")
///     .connect("big", "count");
/// assert!(graph.validate().is_ok());
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<OperatorKind>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source node.
    #[must_use]
    pub fn add_source(mut self, source: Box<dyn Source>) -> Self {
        self.nodes.push(OperatorKind::Source(source));
        self
    }

    /// Adds a mid-graph operator node.
    #[must_use]
    pub fn add_operator(mut self, op: Box<dyn Operator>) -> Self {
        self.nodes.push(OperatorKind::Transform(op));
        self
    }

    /// Adds a sink node.
    #[must_use]
    pub fn add_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.nodes.push(OperatorKind::Sink(sink));
        self
    }

    /// Connects `from` to `to` with the runtime's default queue capacity.
    #[must_use]
    pub fn connect(mut self, from: &str, to: &str) -> Self {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            capacity: None,
        });
        self
    }

    /// Connects `from` to `to` with an explicit queue capacity.
    #[must_use]
    pub fn connect_with_capacity(mut self, from: &str, to: &str, capacity: usize) -> Self {
        self.edges.push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            capacity: Some(capacity),
        });
        self
    }

    /// Returns the declared nodes.
    #[must_use]
    pub fn nodes(&self) -> &[OperatorKind] {
        &self.nodes
    }

    /// Returns the declared edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Consumes the builder, returning nodes and edges.
    #[must_use]
    pub fn into_parts(self) -> (Vec<OperatorKind>, Vec<Edge>) {
        (self.nodes, self.edges)
    }

    /// Checks the structural invariants without materializing anything.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::EmptyGraph`] — no nodes declared.
    /// - [`RuntimeError::DuplicateOperator`] — two nodes share a name.
    /// - [`RuntimeError::UnknownOperator`] — an edge endpoint was never added.
    /// - [`RuntimeError::SourceHasInput`] / [`RuntimeError::SinkHasOutput`]
    ///   — degree rules for terminal nodes.
    /// - [`RuntimeError::MultipleInputs`] — a node is the target of more
    ///   than one edge.
    /// - [`RuntimeError::CyclicGraph`] — the drain loop could never
    ///   terminate.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.nodes.is_empty() {
            return Err(RuntimeError::EmptyGraph);
        }

        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, node) in self.nodes.iter().enumerate() {
            if index.insert(node.name(), i).is_some() {
                return Err(RuntimeError::DuplicateOperator(node.name().to_string()));
            }
        }

        let mut targets: FxHashSet<&str> = FxHashSet::default();
        for edge in &self.edges {
            let Some(&from_idx) = index.get(edge.from.as_str()) else {
                return Err(RuntimeError::UnknownOperator(edge.from.clone()));
            };
            let Some(&to_idx) = index.get(edge.to.as_str()) else {
                return Err(RuntimeError::UnknownOperator(edge.to.clone()));
            };
            if self.nodes[from_idx].is_sink() {
                return Err(RuntimeError::SinkHasOutput(edge.from.clone()));
            }
            if self.nodes[to_idx].is_source() {
                return Err(RuntimeError::SourceHasInput(edge.to.clone()));
            }
            if !targets.insert(edge.to.as_str()) {
                return Err(RuntimeError::MultipleInputs(edge.to.clone()));
            }
        }

        self.check_acyclic(&index)
    }

    /// Kahn's algorithm over the declared edges.
    fn check_acyclic(&self, index: &FxHashMap<&str, usize>) -> Result<(), RuntimeError> {
        let n = self.nodes.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        for edge in &self.edges {
            let from = index[edge.from.as_str()];
            let to = index[edge.to.as_str()];
            adjacency[from].push(to);
            in_degree[to] += 1;
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut visited = 0;
        while let Some(node) = queue.pop() {
            visited += 1;
            for &next in &adjacency[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        if visited == n {
            Ok(())
        } else {
            Err(RuntimeError::CyclicGraph)
        }
    }
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

//! Error types for runtime construction and lifecycle.

use crate::runtime::RuntimeState;

/// Errors from graph validation and runtime lifecycle operations.
///
/// Closed queues and full queues are *not* errors anywhere in the engine;
/// they are normal flow-control signals reported through return values.
/// This enum covers the genuinely fatal conditions: misusing the
/// lifecycle, or declaring a graph that cannot be materialized.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A lifecycle method was called in the wrong state.
    #[error("invalid runtime state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: RuntimeState,
        /// State the runtime was in.
        actual: RuntimeState,
    },

    /// Two graph nodes share a name.
    #[error("operator '{0}' already exists in the graph")]
    DuplicateOperator(String),

    /// An edge references a name that was never added.
    #[error("edge references unknown operator '{0}'")]
    UnknownOperator(String),

    /// A source appears as the target of an edge.
    #[error("source '{0}' cannot have an input edge")]
    SourceHasInput(String),

    /// A sink appears as the origin of an edge.
    #[error("sink '{0}' cannot have an output edge")]
    SinkHasOutput(String),

    /// A non-source operator has more than one inbound edge; each
    /// operator owns exactly one input queue.
    #[error("operator '{0}' has more than one input edge")]
    MultipleInputs(String),

    /// The graph contains a cycle, so drain could never terminate.
    #[error("graph contains a cycle")]
    CyclicGraph,

    /// The graph has no nodes.
    #[error("graph has no operators")]
    EmptyGraph,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::InvalidState {
            expected: RuntimeState::Created,
            actual: RuntimeState::Running,
        };
        assert_eq!(
            err.to_string(),
            "invalid runtime state: expected Created, was Running"
        );
        assert_eq!(
            RuntimeError::DuplicateOperator("map".into()).to_string(),
            "operator 'map' already exists in the graph"
        );
        assert_eq!(RuntimeError::CyclicGraph.to_string(), "graph contains a cycle");
    }
}

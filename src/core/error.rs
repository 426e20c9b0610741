use thiserror::Error;

use crate::core::{Method, NodeId};

/// Crate-wide result alias. The error type defaults to [`DagError`] but can
/// be overridden, so `Result<T, NodeError>` also reads naturally.
pub type Result<T, E = DagError> = std::result::Result<T, E>;

/// Everything that can go wrong while building or running a DAG.
///
/// Every failure aborts the current call; nothing is retried and nothing is
/// logged-and-continued. Outputs already stored on upstream nodes before a
/// run failed are kept, which helps when debugging a broken pipeline.
#[derive(Debug, Error)]
pub enum DagError {
    /// Malformed identifier or name at construction or connection time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Duplicate nid insertion in strict mode.
    #[error("a node with nid `{0}` already belongs to the DAG")]
    AlreadyExists(NodeId),

    /// Reference to a node id, method, or output name that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The child input is already fed by some parent output.
    #[error("input `{input}` of node `{child}` is already receiving output from node `{parent}`")]
    AlreadyConnected {
        child: NodeId,
        input: String,
        parent: NodeId,
    },

    /// A bare node id was used in `connect` against a node that does not
    /// have exactly one input/output.
    #[error("node `{nid}` has {count} {kind}s; name one explicitly")]
    AmbiguousReference {
        nid: NodeId,
        kind: &'static str,
        count: usize,
    },

    /// The requested edge would close a cycle. The edge is rolled back
    /// before this is returned.
    #[error("creating edge `{parent}` -> `{child}` introduces a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    /// An operation invariant was violated, e.g. `unique_sink` on a graph
    /// with two sinks.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A node has no behaviour registered for the requested method.
    #[error("node `{nid}` has no method `{method}`")]
    MethodNotFound { nid: NodeId, method: Method },

    /// A node's behaviour ran and failed with a domain error.
    #[error("node `{nid}` failed while executing `{method}`: {source}")]
    ExecutionFailed {
        nid: NodeId,
        method: Method,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

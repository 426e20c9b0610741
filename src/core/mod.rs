pub mod dag;
pub mod error;
pub mod graph;
pub mod node;

use std::collections::HashMap;

/// Unique identifier of a node within one DAG.
///
/// Uniqueness is enforced per DAG, not globally. This alias exists to keep
/// signatures readable (e.g. `HashMap<NodeId, ...>` instead of
/// `HashMap<String, ...>`).
pub type NodeId = String;

/// Name of a node method, e.g. `fit` or `predict`.
///
/// The engine never interprets it: it is a dispatch selector for
/// [`node::NodeLogic::call`] and the cache-bucket key of each node's output
/// store.
pub type Method = String;

/// The value currency flowing along edges. Alias for `serde_json::Value`
/// since it is used everywhere.
pub type NodeValue = serde_json::Value;

/// Mapping from a node's input name to the value wired into it.
pub type NodeInput = HashMap<String, NodeValue>;

/// Mapping from a node's output name to the corresponding value.
pub type NodeOutput = HashMap<String, NodeValue>;

/// Result of a whole-graph run: sink node id -> that node's output bundle.
pub type DagOutput = HashMap<NodeId, NodeOutput>;

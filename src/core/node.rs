use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::core::error::{DagError, Result};
use crate::core::{Method, NodeId, NodeInput, NodeOutput, NodeValue};

/// Error returned by a [`NodeLogic`] implementation.
///
/// The DAG attaches the offending node id before propagating, so behaviours
/// never need to know which node they are mounted on.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The behaviour has nothing registered under the requested method.
    #[error("no method `{0}`")]
    MethodNotFound(Method),

    /// The behaviour ran and failed with a domain error.
    #[error(transparent)]
    Execution(Box<dyn std::error::Error + Send + Sync>),
}

impl NodeError {
    /// Wrap a domain error as an execution failure.
    pub fn execution(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        NodeError::Execution(err.into())
    }
}

/// Defines the behaviour of a dataflow node.
///
/// A behaviour exposes one callable per method name (e.g. `fit` and
/// `predict`). `inputs` holds exactly the values wired into the node's
/// declared inputs; the returned bundle must contain a value for every
/// declared output. Methods the behaviour does not support are reported
/// with [`NodeError::MethodNotFound`] rather than panicking, so the DAG can
/// scope the error to the node that rejected the dispatch.
pub trait NodeLogic: Send + 'static {
    /// Invoke the behaviour registered under `method`.
    fn call(
        &mut self,
        method: &str,
        inputs: NodeInput,
    ) -> std::result::Result<NodeOutput, NodeError>;
}

type MethodFn = Box<dyn FnMut(NodeInput) -> std::result::Result<NodeOutput, NodeError> + Send>;

/// A [`NodeLogic`] backed by a table of closures keyed by method name.
///
/// Handy for nodes whose methods are stateless transformations; stateful
/// behaviours (e.g. a model that learns during `fit` and replays during
/// `predict`) are usually cleaner as a struct implementing [`NodeLogic`]
/// directly.
#[derive(Default)]
pub struct MethodRegistry {
    table: HashMap<Method, MethodFn>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `method`. Chainable.
    pub fn on<F>(mut self, method: &str, f: F) -> Self
    where
        F: FnMut(NodeInput) -> std::result::Result<NodeOutput, NodeError> + Send + 'static,
    {
        if self.table.insert(method.to_string(), Box::new(f)).is_some() {
            log::warn!("method `{method}` was already registered; overwriting");
        }
        self
    }
}

impl NodeLogic for MethodRegistry {
    fn call(
        &mut self,
        method: &str,
        inputs: NodeInput,
    ) -> std::result::Result<NodeOutput, NodeError> {
        match self.table.get_mut(method) {
            Some(f) => f(inputs),
            None => Err(NodeError::MethodNotFound(method.to_string())),
        }
    }
}

/// A unit of computation in a DAG.
///
/// A node has a unique identifier, fixed sets of named inputs and outputs,
/// and a per-method output store: running `fit` and `predict` on the same
/// node keeps two independent output bundles. The store is written only by
/// the executing DAG; callers read it back through [`Node::get_output`] and
/// [`Node::get_outputs`].
pub struct Node {
    nid: NodeId,
    input_names: Vec<String>,
    output_names: Vec<String>,
    /// method name -> output name -> stored value
    output_store: HashMap<Method, NodeOutput>,
    behaviour: Box<dyn NodeLogic>,
}

impl Node {
    /// Create a node with the given identity, interface names, and behaviour.
    ///
    /// Fails with [`DagError::InvalidArgument`] if `nid` is empty or if
    /// `inputs`/`outputs` contain an empty or duplicate name. The input and
    /// output namespaces are independent: an input and an output may share
    /// a name.
    pub fn new<L: NodeLogic>(
        nid: impl Into<NodeId>,
        inputs: &[&str],
        outputs: &[&str],
        behaviour: L,
    ) -> Result<Self> {
        let nid = nid.into();
        if nid.is_empty() {
            return Err(DagError::InvalidArgument(
                "empty string chosen for nid".to_string(),
            ));
        }
        let input_names = validate_names("input", inputs)?;
        let output_names = validate_names("output", outputs)?;
        Ok(Node {
            nid,
            input_names,
            output_names,
            output_store: HashMap::new(),
            behaviour: Box::new(behaviour),
        })
    }

    pub fn nid(&self) -> &str {
        &self.nid
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Return the stored value of output `name` for the requested `method`.
    pub fn get_output(&self, method: &str, name: &str) -> Result<&NodeValue> {
        let bucket = self.method_bucket(method)?;
        if !self.output_names.iter().any(|n| n == name) {
            return Err(DagError::NotFound(format!(
                "`{name}` is not an output of node `{}`",
                self.nid
            )));
        }
        bucket.get(name).ok_or_else(|| {
            DagError::NotFound(format!(
                "output `{name}` of node `{}` has no value for method `{method}`",
                self.nid
            ))
        })
    }

    /// Return the full output bundle stored for the requested `method`.
    pub fn get_outputs(&self, method: &str) -> Result<&NodeOutput> {
        self.method_bucket(method)
    }

    /// Store the value of output `name` under `method`.
    ///
    /// Orchestrator-only: the DAG is the sole external writer of the output
    /// store. Creates the per-method bucket lazily; overwrites on re-run.
    pub(crate) fn store_output(&mut self, method: &str, name: &str, value: NodeValue) -> Result<()> {
        if !self.output_names.iter().any(|n| n == name) {
            return Err(DagError::InvalidArgument(format!(
                "`{name}` is not an output of node `{}`",
                self.nid
            )));
        }
        self.output_store
            .entry(method.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Dispatch `method` on the node's behaviour, scoping any failure to
    /// this node's id.
    pub(crate) fn invoke(&mut self, method: &str, inputs: NodeInput) -> Result<NodeOutput> {
        self.behaviour.call(method, inputs).map_err(|e| match e {
            NodeError::MethodNotFound(m) => DagError::MethodNotFound {
                nid: self.nid.clone(),
                method: m,
            },
            NodeError::Execution(source) => DagError::ExecutionFailed {
                nid: self.nid.clone(),
                method: method.to_string(),
                source,
            },
        })
    }

    fn method_bucket(&self, method: &str) -> Result<&NodeOutput> {
        self.output_store.get(method).ok_or_else(|| {
            DagError::NotFound(format!(
                "method `{method}` of node `{}` has no stored outputs",
                self.nid
            ))
        })
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("nid", &self.nid)
            .field("input_names", &self.input_names)
            .field("output_names", &self.output_names)
            .field("methods_run", &self.output_store.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Ensure all names are non-empty and distinct, returning them owned.
fn validate_names(kind: &str, items: &[&str]) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if item.is_empty() {
            return Err(DagError::InvalidArgument(format!("empty {kind} name")));
        }
        if names.iter().any(|n| n == item) {
            return Err(DagError::InvalidArgument(format!(
                "duplicate {kind} name `{item}`"
            )));
        }
        names.push((*item).to_string());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Behaviour that echoes a constant under `fit` only.
    struct ConstLogic;

    impl NodeLogic for ConstLogic {
        fn call(
            &mut self,
            method: &str,
            _inputs: NodeInput,
        ) -> std::result::Result<NodeOutput, NodeError> {
            if method != "fit" {
                return Err(NodeError::MethodNotFound(method.to_string()));
            }
            Ok(HashMap::from([("out".to_string(), json!(42))]))
        }
    }

    #[test]
    fn test_rejects_empty_nid() {
        let res = Node::new("", &[], &[], ConstLogic);
        assert!(matches!(res, Err(DagError::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_empty_and_duplicate_names() {
        assert!(matches!(
            Node::new("n", &["a", ""], &[], ConstLogic),
            Err(DagError::InvalidArgument(_))
        ));
        assert!(matches!(
            Node::new("n", &["a", "a"], &[], ConstLogic),
            Err(DagError::InvalidArgument(_))
        ));
        assert!(matches!(
            Node::new("n", &[], &["x", "x"], ConstLogic),
            Err(DagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_input_and_output_may_share_a_name() {
        let node = Node::new("n", &["df"], &["df"], ConstLogic).unwrap();
        assert_eq!(node.input_names(), &["df".to_string()]);
        assert_eq!(node.output_names(), &["df".to_string()]);
    }

    #[test]
    fn test_get_output_before_any_run_is_not_found() {
        let node = Node::new("n", &[], &["out"], ConstLogic).unwrap();
        assert!(matches!(
            node.get_output("fit", "out"),
            Err(DagError::NotFound(_))
        ));
        assert!(matches!(
            node.get_outputs("fit"),
            Err(DagError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_and_read_back_per_method() {
        let mut node = Node::new("n", &[], &["out"], ConstLogic).unwrap();
        node.store_output("fit", "out", json!(1)).unwrap();
        node.store_output("predict", "out", json!(2)).unwrap();
        assert_eq!(node.get_output("fit", "out").unwrap(), &json!(1));
        assert_eq!(node.get_output("predict", "out").unwrap(), &json!(2));
        // Re-running the same method overwrites.
        node.store_output("fit", "out", json!(3)).unwrap();
        assert_eq!(node.get_output("fit", "out").unwrap(), &json!(3));
    }

    #[test]
    fn test_store_rejects_undeclared_output() {
        let mut node = Node::new("n", &[], &["out"], ConstLogic).unwrap();
        assert!(matches!(
            node.store_output("fit", "bogus", json!(0)),
            Err(DagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_output_rejects_undeclared_name() {
        let mut node = Node::new("n", &[], &["out"], ConstLogic).unwrap();
        node.store_output("fit", "out", json!(1)).unwrap();
        assert!(matches!(
            node.get_output("fit", "bogus"),
            Err(DagError::NotFound(_))
        ));
    }

    #[test]
    fn test_invoke_scopes_method_not_found_to_node() {
        let mut node = Node::new("n", &[], &["out"], ConstLogic).unwrap();
        let err = node.invoke("predict", NodeInput::new()).unwrap_err();
        match err {
            DagError::MethodNotFound { nid, method } => {
                assert_eq!(nid, "n");
                assert_eq!(method, "predict");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_method_registry_dispatch() {
        let mut registry = MethodRegistry::new().on("fit", |_inputs| {
            Ok(HashMap::from([("out".to_string(), json!("fitted"))]))
        });
        let out = registry.call("fit", NodeInput::new()).unwrap();
        assert_eq!(out["out"], json!("fitted"));
        assert!(matches!(
            registry.call("predict", NodeInput::new()),
            Err(NodeError::MethodNotFound(_))
        ));
    }

    #[test]
    fn test_execution_error_carries_source() {
        let mut node = Node::new(
            "n",
            &[],
            &["out"],
            MethodRegistry::new()
                .on("fit", |_inputs| Err(NodeError::execution("bad input data"))),
        )
        .unwrap();
        let err = node.invoke("fit", NodeInput::new()).unwrap_err();
        assert!(err.to_string().contains("node `n`"));
        assert!(err.to_string().contains("bad input data"));
    }
}

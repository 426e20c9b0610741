use crate::core::error::{DagError, Result};
use crate::core::graph::DiGraph;
use crate::core::node::Node;
use crate::core::{DagOutput, NodeId, NodeInput, NodeOutput};

/// Governs how [`Dag::add_node`] treats a nid that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Re-inserting an existing nid is an error.
    #[default]
    Strict,
    /// Re-inserting evicts the old node and everything downstream of it,
    /// then inserts the new node fresh with no edges. Useful for
    /// interactive sessions that rebuild a graph incrementally.
    Loose,
}

/// One side of a [`Dag::connect`] call: a node id plus, optionally, the
/// input/output name on that node.
///
/// Built from a bare `&str`/`String` (valid only when the node has exactly
/// one declared name on the relevant side) or from an `(id, name)` pair.
#[derive(Debug, Clone)]
pub struct Endpoint {
    nid: NodeId,
    name: Option<String>,
}

impl From<&str> for Endpoint {
    fn from(nid: &str) -> Self {
        Endpoint {
            nid: nid.to_string(),
            name: None,
        }
    }
}

impl From<String> for Endpoint {
    fn from(nid: String) -> Self {
        Endpoint { nid, name: None }
    }
}

impl From<(&str, &str)> for Endpoint {
    fn from((nid, name): (&str, &str)) -> Self {
        Endpoint {
            nid: nid.to_string(),
            name: Some(name.to_string()),
        }
    }
}

impl From<(String, String)> for Endpoint {
    fn from((nid, name): (String, String)) -> Self {
        Endpoint {
            nid,
            name: Some(name),
        }
    }
}

/// A directed acyclic graph of [`Node`]s.
///
/// The DAG owns its nodes, manages the parent-output -> child-input wiring,
/// and executes nodes in dependency order, storing each node's outputs back
/// onto the node keyed by the requested method. The graph is acyclic at all
/// times: an edge that would close a cycle is rolled back before
/// [`Dag::connect`] returns.
pub struct Dag {
    name: Option<String>,
    mode: Mode,
    graph: DiGraph<Node>,
}

impl Default for Dag {
    fn default() -> Self {
        Self::new()
    }
}

impl Dag {
    /// Create an unnamed DAG in [`Mode::Strict`].
    pub fn new() -> Self {
        Self::with_mode(Mode::Strict)
    }

    pub fn with_mode(mode: Mode) -> Self {
        Dag {
            name: None,
            mode,
            graph: DiGraph::new(),
        }
    }

    /// Attach a descriptive name. Cosmetic only.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Node ids currently in the DAG, in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        self.graph.ids()
    }

    /// Add `node`, keyed by its nid.
    ///
    /// In strict mode a duplicate nid fails with [`DagError::AlreadyExists`].
    /// In loose mode the existing node's descendants are removed first (so
    /// nothing downstream keeps edges into stale structure), then the
    /// existing node itself, and the new node is inserted with no edges.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.graph.contains(node.nid()) {
            match self.mode {
                Mode::Strict => {
                    return Err(DagError::AlreadyExists(node.nid().to_string()));
                }
                Mode::Loose => {
                    log::warn!(
                        "node `{}` is already in the DAG; removing it, its descendants, \
                         and all incident edges",
                        node.nid()
                    );
                    for nid in self.graph.descendants(node.nid()) {
                        log::warn!("removing nid=`{nid}`");
                        self.remove_node(&nid)?;
                    }
                    log::warn!("removing nid=`{}`", node.nid());
                    self.remove_node(node.nid())?;
                }
            }
        }
        self.graph.add_vertex(node.nid().to_string(), node);
        Ok(())
    }

    /// Convenience node accessor.
    pub fn get_node(&self, nid: &str) -> Result<&Node> {
        self.graph
            .payload(nid)
            .ok_or_else(|| DagError::NotFound(format!("node `{nid}` is not in the DAG")))
    }

    /// Remove a node and clear all of its edges, both directions.
    pub fn remove_node(&mut self, nid: &str) -> Result<()> {
        if self.graph.remove_vertex(nid).is_none() {
            return Err(DagError::NotFound(format!("node `{nid}` is not in the DAG")));
        }
        Ok(())
    }

    /// Add a directed edge from a parent output to a child input.
    ///
    /// Calling this repeatedly for the same node pair with different name
    /// pairs augments the existing edge; earlier bindings are kept. A child
    /// input can be fed by at most one parent output across all incoming
    /// edges. Acyclicity is verified after insertion because a cycle is only
    /// visible graph-wide; on violation the just-added binding is rolled
    /// back and the call fails with [`DagError::CycleDetected`].
    pub fn connect(
        &mut self,
        parent: impl Into<Endpoint>,
        child: impl Into<Endpoint>,
    ) -> Result<()> {
        let parent = parent.into();
        let child = child.into();
        let parent_out = self.resolve_endpoint(&parent, Side::Output)?;
        let child_in = self.resolve_endpoint(&child, Side::Input)?;
        // The child input must not already be hooked up to any output.
        for pre in self.graph.predecessors(&child.nid) {
            if let Some(bindings) = self.graph.bindings(pre, &child.nid) {
                if bindings.contains_key(&child_in) {
                    return Err(DagError::AlreadyConnected {
                        child: child.nid.clone(),
                        input: child_in,
                        parent: pre.clone(),
                    });
                }
            }
        }
        let edge_existed = self.graph.bindings(&parent.nid, &child.nid).is_some();
        self.graph
            .bind(&parent.nid, &child.nid, &child_in, &parent_out);
        if !self.graph.is_acyclic() {
            // Roll back exactly what this call added: the whole edge if it
            // is new, otherwise just the new binding.
            if edge_existed {
                self.graph.remove_binding(&parent.nid, &child.nid, &child_in);
            } else {
                self.graph.remove_edge(&parent.nid, &child.nid);
            }
            return Err(DagError::CycleDetected {
                parent: parent.nid,
                child: child.nid,
            });
        }
        Ok(())
    }

    /// Node ids with no incoming edges, ordered consistent with a
    /// topological ordering.
    pub fn get_sources(&self) -> Vec<NodeId> {
        self.graph
            .topo_order()
            .into_iter()
            .filter(|nid| self.graph.predecessors(nid).is_empty())
            .collect()
    }

    /// Node ids with no outgoing edges, ordered consistent with a
    /// topological ordering.
    pub fn get_sinks(&self) -> Vec<NodeId> {
        self.graph
            .topo_order()
            .into_iter()
            .filter(|nid| self.graph.successors(nid).is_empty())
            .collect()
    }

    /// Return the single sink, failing if there is not exactly one.
    pub fn get_unique_sink(&self) -> Result<NodeId> {
        let sinks = self.get_sinks();
        let [sink] = sinks.as_slice() else {
            return Err(DagError::InvalidState(format!(
                "expected exactly one sink, found {sinks:?}"
            )));
        };
        Ok(sink.clone())
    }

    /// Execute the entire DAG under `method`.
    ///
    /// Every node runs exactly once, predecessors strictly before
    /// successors. Returns each sink's full output bundle, keyed by nid.
    pub fn run_dag(&mut self, method: &str) -> Result<DagOutput> {
        let sinks = self.get_sinks();
        for nid in self.graph.topo_order() {
            self.run_node(&nid, method)?;
        }
        let mut out = DagOutput::new();
        for sink in sinks {
            let bundle = self.get_node(&sink)?.get_outputs(method)?.clone();
            out.insert(sink, bundle);
        }
        Ok(out)
    }

    /// Execute the DAG up to (and including) node `nid` and return its
    /// output bundle.
    ///
    /// "leq" refers to the partial ordering on the vertices: a node runs if
    /// and only if there is a directed path from it to `nid`. Nodes off
    /// every path into `nid` are never executed. There is no cross-call
    /// memoization: every call re-executes the whole prefix. With
    /// `progress` set, one `info` line is emitted per executed node.
    pub fn run_leq_node(&mut self, nid: &str, method: &str, progress: bool) -> Result<NodeOutput> {
        self.get_node(nid)?;
        let ancestors = self.graph.ancestors(nid);
        let mut prefix: Vec<NodeId> = self
            .graph
            .topo_order()
            .into_iter()
            .filter(|n| ancestors.contains(n))
            .collect();
        prefix.push(nid.to_string());
        let total = prefix.len();
        for (i, n) in prefix.iter().enumerate() {
            if progress {
                log::info!("run_leq_node: [{}/{total}] node `{n}`", i + 1);
            }
            self.run_node(n, method)?;
        }
        Ok(self.get_node(nid)?.get_outputs(method)?.clone())
    }

    /// Run a single node: gather inputs from already-executed direct
    /// predecessors, dispatch the method, store the declared outputs.
    ///
    /// Does not run (or re-run) ancestors; callers are responsible for
    /// ordering.
    fn run_node(&mut self, nid: &str, method: &str) -> Result<()> {
        log::debug!("node `{nid}`: executing method `{method}`");
        let mut inputs = NodeInput::new();
        for pre in self.graph.predecessors(nid) {
            let pre_node = self.get_node(pre)?;
            if let Some(bindings) = self.graph.bindings(pre, nid) {
                for (child_in, parent_out) in bindings {
                    let value = pre_node.get_output(method, parent_out)?.clone();
                    inputs.insert(child_in.clone(), value);
                }
            }
        }
        let node = self
            .graph
            .payload_mut(nid)
            .ok_or_else(|| DagError::NotFound(format!("node `{nid}` is not in the DAG")))?;
        let produced = node.invoke(method, inputs)?;
        for name in node.output_names().to_vec() {
            let value = produced.get(&name).cloned().ok_or_else(|| {
                DagError::NotFound(format!(
                    "method `{method}` of node `{nid}` did not produce declared output `{name}`"
                ))
            })?;
            node.store_output(method, &name, value)?;
        }
        Ok(())
    }

    fn resolve_endpoint(&self, endpoint: &Endpoint, side: Side) -> Result<String> {
        let node = self.get_node(&endpoint.nid)?;
        let declared = match side {
            Side::Input => node.input_names(),
            Side::Output => node.output_names(),
        };
        match &endpoint.name {
            Some(name) => {
                if declared.iter().any(|n| n == name) {
                    Ok(name.clone())
                } else {
                    Err(DagError::InvalidArgument(format!(
                        "`{name}` is not an {} of node `{}`",
                        side.label(),
                        endpoint.nid
                    )))
                }
            }
            // Bare id: only unambiguous when there is exactly one name.
            None => match declared {
                [sole] => Ok(sole.clone()),
                _ => Err(DagError::AmbiguousReference {
                    nid: endpoint.nid.clone(),
                    kind: side.label(),
                    count: declared.len(),
                }),
            },
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Input,
    Output,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Input => "input",
            Side::Output => "output",
        }
    }
}

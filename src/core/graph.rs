use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::NodeId;

/// Attributes carried on an edge: child input name -> parent output name.
///
/// One edge can carry several bindings when the same node pair is connected
/// repeatedly with different name pairs.
pub(crate) type EdgeBindings = HashMap<String, String>;

struct Vertex<V> {
    payload: V,
    /// Direct predecessors, in the order their edges were added.
    preds: Vec<NodeId>,
    /// Direct successors, in the order their edges were added.
    succs: Vec<NodeId>,
    /// Bindings of each outgoing edge, keyed by the child vertex.
    out_bindings: HashMap<NodeId, EdgeBindings>,
}

/// Adjacency-list directed graph keyed by node id.
///
/// Vertices carry an owned payload and are additionally kept in insertion
/// order, so every traversal (and in particular the topological sort) is
/// deterministic for a given construction sequence.
pub(crate) struct DiGraph<V> {
    vertices: HashMap<NodeId, Vertex<V>>,
    order: Vec<NodeId>,
}

impl<V> Default for DiGraph<V> {
    fn default() -> Self {
        DiGraph {
            vertices: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<V> DiGraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nid: &str) -> bool {
        self.vertices.contains_key(nid)
    }

    /// Vertex ids in insertion order.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Insert a vertex. The caller is responsible for ensuring `nid` is not
    /// already present.
    pub fn add_vertex(&mut self, nid: NodeId, payload: V) {
        debug_assert!(!self.vertices.contains_key(&nid));
        self.order.push(nid.clone());
        self.vertices.insert(
            nid,
            Vertex {
                payload,
                preds: Vec::new(),
                succs: Vec::new(),
                out_bindings: HashMap::new(),
            },
        );
    }

    pub fn payload(&self, nid: &str) -> Option<&V> {
        self.vertices.get(nid).map(|v| &v.payload)
    }

    pub fn payload_mut(&mut self, nid: &str) -> Option<&mut V> {
        self.vertices.get_mut(nid).map(|v| &mut v.payload)
    }

    /// Remove a vertex along with all incident edges, both directions.
    pub fn remove_vertex(&mut self, nid: &str) -> Option<V> {
        let vertex = self.vertices.remove(nid)?;
        self.order.retain(|id| id != nid);
        for pred in &vertex.preds {
            if let Some(v) = self.vertices.get_mut(pred) {
                v.succs.retain(|id| id != nid);
                v.out_bindings.remove(nid);
            }
        }
        for succ in &vertex.succs {
            if let Some(v) = self.vertices.get_mut(succ) {
                v.preds.retain(|id| id != nid);
            }
        }
        Some(vertex.payload)
    }

    /// Add the binding `input -> output` to the edge `parent -> child`,
    /// creating the edge if the pair is not yet connected. Both vertices
    /// must exist.
    pub fn bind(&mut self, parent: &str, child: &str, input: &str, output: &str) {
        let pv = self
            .vertices
            .get_mut(parent)
            .expect("bind called with unknown parent vertex");
        let edge_exists = pv.out_bindings.contains_key(child);
        pv.out_bindings
            .entry(child.to_string())
            .or_default()
            .insert(input.to_string(), output.to_string());
        if !edge_exists {
            pv.succs.push(child.to_string());
            self.vertices
                .get_mut(child)
                .expect("bind called with unknown child vertex")
                .preds
                .push(parent.to_string());
        }
    }

    /// Drop a single binding from an existing edge, keeping the edge and
    /// its remaining bindings.
    pub fn remove_binding(&mut self, parent: &str, child: &str, input: &str) {
        if let Some(v) = self.vertices.get_mut(parent) {
            if let Some(bindings) = v.out_bindings.get_mut(child) {
                bindings.remove(input);
            }
        }
    }

    /// Drop the edge `parent -> child` wholesale.
    pub fn remove_edge(&mut self, parent: &str, child: &str) {
        if let Some(v) = self.vertices.get_mut(parent) {
            if v.out_bindings.remove(child).is_some() {
                v.succs.retain(|id| id != child);
            }
        }
        if let Some(v) = self.vertices.get_mut(child) {
            v.preds.retain(|id| id != parent);
        }
    }

    pub fn bindings(&self, parent: &str, child: &str) -> Option<&EdgeBindings> {
        self.vertices.get(parent)?.out_bindings.get(child)
    }

    pub fn predecessors(&self, nid: &str) -> &[NodeId] {
        self.vertices.get(nid).map(|v| v.preds.as_slice()).unwrap_or(&[])
    }

    pub fn successors(&self, nid: &str) -> &[NodeId] {
        self.vertices.get(nid).map(|v| v.succs.as_slice()).unwrap_or(&[])
    }

    /// Kahn's algorithm, seeded and advanced in insertion order.
    ///
    /// Vertices that sit on a cycle never reach in-degree zero and are
    /// omitted, so the result is complete iff the graph is acyclic.
    pub fn topo_order(&self) -> Vec<NodeId> {
        let mut indegree: HashMap<&str, usize> = self
            .vertices
            .iter()
            .map(|(id, v)| (id.as_str(), v.preds.len()))
            .collect();
        let mut ready: VecDeque<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|id| indegree.get(id).copied() == Some(0))
            .collect();
        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(id) = ready.pop_front() {
            sorted.push(id.to_string());
            for succ in self.successors(id) {
                if let Some(d) = indegree.get_mut(succ.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(succ.as_str());
                    }
                }
            }
        }
        sorted
    }

    pub fn is_acyclic(&self) -> bool {
        self.topo_order().len() == self.order.len()
    }

    /// All vertices with a directed path to `nid`, excluding `nid` itself.
    pub fn ancestors(&self, nid: &str) -> HashSet<NodeId> {
        self.reachable(nid, |g, id| g.predecessors(id))
    }

    /// All vertices reachable from `nid`, excluding `nid` itself, in
    /// breadth-first order.
    pub fn descendants(&self, nid: &str) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut frontier: VecDeque<&str> = VecDeque::from([nid]);
        let mut found = Vec::new();
        while let Some(id) = frontier.pop_front() {
            for succ in self.successors(id) {
                if seen.insert(succ.clone()) {
                    found.push(succ.clone());
                    frontier.push_back(succ);
                }
            }
        }
        found
    }

    fn reachable<'a, F>(&'a self, nid: &str, neighbors: F) -> HashSet<NodeId>
    where
        F: Fn(&'a Self, &str) -> &'a [NodeId],
    {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut frontier: Vec<&str> = vec![nid];
        while let Some(id) = frontier.pop() {
            for next in neighbors(self, id) {
                if seen.insert(next.clone()) {
                    frontier.push(next);
                }
            }
        }
        seen
    }
}

//! # Ferroflow
//!
//! A small dataflow engine: build directed acyclic graphs of compute nodes
//! with named inputs and outputs, wire them together, and run them in
//! dependency order.
//!
//! ## Features
//!
//! - **Named wiring**: edges connect a parent's named output to a child's
//!   named input; each input is fed by at most one output
//! - **Per-method output store**: running `fit` and `predict` on the same
//!   graph keeps two independent result sets on every node
//! - **Always acyclic**: an edge that would close a cycle is rejected and
//!   rolled back
//! - **Partial runs**: execute only the ancestors of one node with
//!   [`Dag::run_leq_node`]
//! - **Predictable**: strictly sequential, single-threaded execution in a
//!   deterministic topological order
//!
//! ## Quick Start
//!
//! ```rust
//! use ferroflow::prelude::*;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! fn main() -> ferroflow::Result<()> {
//!     let mut dag = Dag::new().with_name("quickstart");
//!     dag.add_node(Node::new(
//!         "load",
//!         &[],
//!         &["df"],
//!         MethodRegistry::new().on("fit", |_inputs| {
//!             Ok(HashMap::from([("df".to_string(), json!([1.0, 2.0, 3.0]))]))
//!         }),
//!     )?)?;
//!     dag.add_node(Node::new(
//!         "scale",
//!         &["df"],
//!         &["df"],
//!         MethodRegistry::new().on("fit", |inputs: NodeInput| {
//!             let scaled: Vec<f64> = inputs["df"]
//!                 .as_array()
//!                 .map(|arr| {
//!                     arr.iter()
//!                         .filter_map(|v| v.as_f64())
//!                         .map(|v| v * 2.0)
//!                         .collect()
//!                 })
//!                 .unwrap_or_default();
//!             Ok(HashMap::from([("df".to_string(), json!(scaled))]))
//!         }),
//!     )?)?;
//!     dag.connect("load", "scale")?;
//!     let outputs = dag.run_dag("fit")?;
//!     assert_eq!(outputs["scale"]["df"], json!([2.0, 4.0, 6.0]));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`Dag`]: the graph container and executor
//! - [`Node`] and [`NodeLogic`]: a compute unit and its behaviour
//! - [`MethodRegistry`]: closure-table behaviour for quick node definitions
//! - [`prelude`]: commonly used types (import with `use ferroflow::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use crate::core::dag::{Dag, Endpoint, Mode};
pub use crate::core::error::{DagError, Result};
pub use crate::core::node::{MethodRegistry, Node, NodeError, NodeLogic};
pub use crate::core::{DagOutput, Method, NodeId, NodeInput, NodeOutput, NodeValue};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// Everything you need to build and run a DAG.
///
/// # Example
/// ```rust
/// use ferroflow::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Dag, DagError, DagOutput, Endpoint, Method, MethodRegistry, Mode, Node, NodeError, NodeId,
        NodeInput, NodeLogic, NodeOutput, NodeValue, Result,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");

//! A complete example showing how to build and run a fit/predict pipeline
//! with Ferroflow.
//!
//! This example demonstrates:
//! - Defining node behaviours (a closure table and a stateful struct)
//! - Wiring named outputs to named inputs
//! - Running the whole DAG under different methods
//! - Running only a prefix of the DAG with `run_leq_node`

use ferroflow::prelude::*;
use serde_json::json;
use std::collections::HashMap;

// ============================================================================
// Step 1: Data Source Node
// ============================================================================

/// Serves the train split to `fit` and the test split to `predict`.
struct PriceLoader;

impl NodeLogic for PriceLoader {
    fn call(&mut self, method: &str, _inputs: NodeInput) -> Result<NodeOutput, NodeError> {
        let prices = match method {
            "fit" => json!([101.0, 103.0, 102.0, 105.0, 104.0]),
            "predict" => json!([106.0, 107.0]),
            other => return Err(NodeError::MethodNotFound(other.to_string())),
        };
        Ok(HashMap::from([("df".to_string(), prices)]))
    }
}

// ============================================================================
// Step 2: Returns Transform Node
// ============================================================================

/// Turns a price series into simple percentage returns. Same computation
/// for both methods, so a closure table keyed by method name fits well.
fn returns_node() -> ferroflow::Result<Node> {
    let compute = |inputs: NodeInput| -> Result<NodeOutput, NodeError> {
        let prices: Vec<f64> = inputs
            .get("df")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default();
        let returns: Vec<f64> = prices
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0] * 100.0)
            .collect();
        Ok(HashMap::from([("df".to_string(), json!(returns))]))
    };
    Node::new(
        "returns",
        &["df"],
        &["df"],
        MethodRegistry::new().on("fit", compute).on("predict", compute),
    )
}

// ============================================================================
// Step 3: Volatility Model Node
// ============================================================================

/// Learns the standard deviation of returns during `fit`, then flags each
/// new return as inside or outside one sigma during `predict`.
#[derive(Default)]
struct SigmaModel {
    sigma: Option<f64>,
}

impl NodeLogic for SigmaModel {
    fn call(&mut self, method: &str, inputs: NodeInput) -> Result<NodeOutput, NodeError> {
        let returns: Vec<f64> = inputs
            .get("df")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default();
        match method {
            "fit" => {
                if returns.is_empty() {
                    return Err(NodeError::execution("cannot fit on an empty series"));
                }
                let mean = returns.iter().sum::<f64>() / returns.len() as f64;
                let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                    / returns.len() as f64;
                let sigma = var.sqrt();
                self.sigma = Some(sigma);
                Ok(HashMap::from([("df".to_string(), json!(sigma))]))
            }
            "predict" => {
                let sigma = self
                    .sigma
                    .ok_or_else(|| NodeError::execution("predict called before fit"))?;
                let flags: Vec<bool> = returns.iter().map(|r| r.abs() <= sigma).collect();
                Ok(HashMap::from([("df".to_string(), json!(flags))]))
            }
            other => Err(NodeError::MethodNotFound(other.to_string())),
        }
    }
}

// ============================================================================
// Main: Build and Execute the DAG
// ============================================================================

fn main() -> ferroflow::Result<()> {
    println!("=== Ferroflow Fit/Predict Example ===\n");

    let mut dag = Dag::new().with_name("volatility_pipeline");
    dag.add_node(Node::new("load", &[], &["df"], PriceLoader)?)?;
    dag.add_node(returns_node()?)?;
    dag.add_node(Node::new("model", &["df"], &["df"], SigmaModel::default())?)?;
    dag.connect("load", "returns")?;
    dag.connect("returns", "model")?;

    println!("nodes: {:?}", dag.node_ids());
    println!("sink:  {}\n", dag.get_unique_sink()?);

    // --- Example 1: Inspect an intermediate stage only ---
    println!("--- run_leq_node(\"returns\", \"fit\") ---");
    let returns = dag.run_leq_node("returns", "fit", false)?;
    println!("train returns: {}\n", returns["df"]);

    // --- Example 2: Fit the whole pipeline ---
    println!("--- run_dag(\"fit\") ---");
    let fit_out = dag.run_dag("fit")?;
    println!("learned sigma: {}\n", fit_out["model"]["df"]);

    // --- Example 3: Predict with the fitted model ---
    println!("--- run_dag(\"predict\") ---");
    let predict_out = dag.run_dag("predict")?;
    println!("within one sigma: {}\n", predict_out["model"]["df"]);

    println!("=== Pipeline completed successfully! ===");
    Ok(())
}

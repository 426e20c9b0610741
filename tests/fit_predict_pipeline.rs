//! End-to-end test of a small fit/predict pipeline built against the public
//! surface only: a data source, a feature transform, and a stateful model
//! node that learns during `fit` and replays the learned state during
//! `predict`.

use std::collections::HashMap;

use ferroflow::prelude::*;
use serde_json::json;

/// Emits a different dataset per method, like a loader that serves the
/// train split to `fit` and the test split to `predict`.
struct SplitSource {
    train: Vec<f64>,
    test: Vec<f64>,
}

impl NodeLogic for SplitSource {
    fn call(&mut self, method: &str, _inputs: NodeInput) -> Result<NodeOutput, NodeError> {
        let data = match method {
            "fit" => &self.train,
            "predict" => &self.test,
            other => return Err(NodeError::MethodNotFound(other.to_string())),
        };
        Ok(HashMap::from([("df".to_string(), json!(data))]))
    }
}

/// Learns the mean of its input during `fit` and predicts it for every row
/// during `predict`.
#[derive(Default)]
struct MeanModel {
    mean: Option<f64>,
}

impl NodeLogic for MeanModel {
    fn call(&mut self, method: &str, inputs: NodeInput) -> Result<NodeOutput, NodeError> {
        let rows: Vec<f64> = inputs
            .get("df")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default();
        match method {
            "fit" => {
                if rows.is_empty() {
                    return Err(NodeError::execution("cannot fit on an empty dataset"));
                }
                let mean = rows.iter().sum::<f64>() / rows.len() as f64;
                self.mean = Some(mean);
                let preds: Vec<f64> = rows.iter().map(|_| mean).collect();
                Ok(HashMap::from([("df".to_string(), json!(preds))]))
            }
            "predict" => {
                let mean = self
                    .mean
                    .ok_or_else(|| NodeError::execution("predict called before fit"))?;
                let preds: Vec<f64> = rows.iter().map(|_| mean).collect();
                Ok(HashMap::from([("df".to_string(), json!(preds))]))
            }
            other => Err(NodeError::MethodNotFound(other.to_string())),
        }
    }
}

/// Pass-through transform that shifts every value by a constant, for both
/// methods.
fn shift_node(nid: &str, delta: f64) -> Node {
    struct Shift(f64);
    impl NodeLogic for Shift {
        fn call(&mut self, _method: &str, inputs: NodeInput) -> Result<NodeOutput, NodeError> {
            let shifted: Vec<f64> = inputs
                .get("df")
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_f64())
                        .map(|v| v + self.0)
                        .collect()
                })
                .unwrap_or_default();
            Ok(HashMap::from([("df".to_string(), json!(shifted))]))
        }
    }
    Node::new(nid, &["df"], &["df"], Shift(delta)).expect("valid node definition")
}

fn build_pipeline() -> ferroflow::Result<Dag> {
    let mut dag = Dag::new().with_name("mean_pipeline");
    dag.add_node(Node::new(
        "load",
        &[],
        &["df"],
        SplitSource {
            train: vec![1.0, 2.0, 3.0, 4.0],
            test: vec![10.0, 20.0],
        },
    )?)?;
    dag.add_node(shift_node("shift", 1.0))?;
    dag.add_node(Node::new(
        "model",
        &["df"],
        &["df"],
        MeanModel::default(),
    )?)?;
    dag.connect("load", "shift")?;
    dag.connect("shift", "model")?;
    Ok(dag)
}

#[test]
fn test_fit_then_predict_flows_through_the_pipeline() {
    let mut dag = build_pipeline().unwrap();
    assert_eq!(dag.get_unique_sink().unwrap(), "model");

    // fit: train split [1,2,3,4] shifted to [2,3,4,5], mean 3.5.
    let fit_out = dag.run_dag("fit").unwrap();
    assert_eq!(fit_out["model"]["df"], json!([3.5, 3.5, 3.5, 3.5]));

    // predict: test split [10,20] shifted to [11,21]; the model replays
    // the mean it learned during fit.
    let predict_out = dag.run_dag("predict").unwrap();
    assert_eq!(predict_out["model"]["df"], json!([3.5, 3.5]));

    // Both buckets remain stored on the sink independently.
    let model = dag.get_node("model").unwrap();
    assert_eq!(model.get_outputs("fit").unwrap()["df"], json!(vec![3.5; 4]));
    assert_eq!(model.get_outputs("predict").unwrap()["df"], json!(vec![3.5; 2]));
}

#[test]
fn test_run_leq_node_skips_everything_downstream() {
    let mut dag = build_pipeline().unwrap();
    let out = dag.run_leq_node("shift", "fit", true).unwrap();
    assert_eq!(out["df"], json!([2.0, 3.0, 4.0, 5.0]));
    // The model never ran.
    assert!(dag.get_node("model").unwrap().get_outputs("fit").is_err());
}

#[test]
fn test_predict_before_fit_surfaces_the_failing_node() {
    let mut dag = build_pipeline().unwrap();
    let err = dag.run_dag("predict").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("model"), "error should name the node: {msg}");
    assert!(msg.contains("predict called before fit"), "{msg}");
    // Upstream nodes ran before the failure and keep their outputs.
    let shift = dag.get_node("shift").unwrap();
    assert_eq!(shift.get_outputs("predict").unwrap()["df"], json!([11.0, 21.0]));
}

#[test]
fn test_loose_mode_supports_interactive_rebuilds() {
    let mut dag = Dag::with_mode(Mode::Loose).with_name("notebook");
    dag.add_node(Node::new(
        "load",
        &[],
        &["df"],
        SplitSource {
            train: vec![1.0, 3.0],
            test: vec![],
        },
    ).unwrap()).unwrap();
    dag.add_node(shift_node("shift", 5.0)).unwrap();
    dag.connect("load", "shift").unwrap();

    // Redefine the shift: the old node (a descendant of nothing here) is
    // evicted along with its own descendants, then re-wired.
    dag.add_node(shift_node("shift", 7.0)).unwrap();
    dag.connect("load", "shift").unwrap();
    let out = dag.run_leq_node("shift", "fit", false).unwrap();
    assert_eq!(out["df"], json!([8.0, 10.0]));
}

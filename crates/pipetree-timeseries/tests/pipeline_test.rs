//! End-to-end forecasting trees built from the time-series operators.

use std::fs;
use std::path::Path;

use pipetree_operator::Output;
use pipetree_timeseries::{ROOT_OPERATOR, registry};
use pipetree_tree::{NodeId, NodeSpec, TransformationTree, load, save};
use serde_json::json;

/// A straight line as a headed two-column CSV.
fn write_trend(path: &Path) {
  let mut csv = String::from("day,temp\n");
  for day in 0..40 {
    csv.push_str(&format!("{day},{}\n", 10.0 + 0.5 * f64::from(day)));
  }
  fs::write(path, csv).unwrap();
}

struct Forecast {
  db: NodeId,
}

/// read -> impute -> design_matrix -> {mean, linear} -> fit -> predict -> mse
fn build(tree: &mut TransformationTree, csv: &Path) -> Forecast {
  let root = tree.root();
  let read = tree
    .add_operator(
      root,
      NodeSpec::new("read_csv")
        .args([json!(csv.to_str().unwrap()), json!("temp")])
        .tag("read"),
    )
    .unwrap();
  let imputed = tree.add_operator(read, NodeSpec::new("impute_missing")).unwrap();
  let db = tree
    .add_operator(
      imputed,
      NodeSpec::new("design_matrix").args([json!(3), json!(0.5)]).tag("db"),
    )
    .unwrap();

  for model in ["mean_model", "linear_model"] {
    let model = tree
      .add_operator(db, NodeSpec::new(model).tag("model"))
      .unwrap();
    let fit = tree.add_operator(model, NodeSpec::new("fit")).unwrap();
    let predict = tree.add_operator(fit, NodeSpec::new("predict")).unwrap();
    tree
      .add_operator(predict, NodeSpec::new("mse").tag("mse").save_result(true))
      .unwrap();
  }

  Forecast { db }
}

fn ranked(results: &[(Output, NodeId)]) -> Vec<(f64, NodeId)> {
  let mut ranked: Vec<(f64, NodeId)> = results
    .iter()
    .map(|(output, node)| (output.as_f64().unwrap(), *node))
    .collect();
  ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
  ranked
}

#[test]
fn test_linear_model_wins_on_a_trend() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let csv = dir.path().join("trend.csv");
  write_trend(&csv);

  let mut tree = TransformationTree::new(registry().unwrap(), ROOT_OPERATOR).unwrap();
  build(&mut tree, &csv);

  let results = tree.execute_tree().unwrap().to_vec();
  assert_eq!(results.len(), 2);

  let ranked = ranked(&results);
  let (best, node) = ranked[0];
  assert!(best < 1e-4, "linear fit error {best}");
  assert!(ranked[1].0 > 1.0);
  assert_eq!(
    tree.get_path_str(node).unwrap(),
    "time_series:root -> read_csv:read -> impute_missing -> design_matrix:db \
     -> linear_model:model -> fit -> predict -> mse:mse"
  );
}

#[test]
fn test_replicated_variants_compete() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let csv = dir.path().join("trend.csv");
  write_trend(&csv);

  let mut tree = TransformationTree::new(registry().unwrap(), ROOT_OPERATOR).unwrap();
  let forecast = build(&mut tree, &csv);

  for window in [1, 2, 4] {
    let copy = tree
      .replicate_subtree(forecast.db, &format!("_{window}_features"))
      .unwrap();
    tree
      .replace_operator(
        copy,
        NodeSpec::new("design_matrix")
          .args([json!(window), json!(0.5)])
          .tag(format!("db_{window}_features")),
      )
      .unwrap();
  }

  let results = tree.execute_tree().unwrap().to_vec();
  assert_eq!(results.len(), 8);
  assert_eq!(tree.get_nodes_by_tag("mse_2_features").len(), 2);
  assert_eq!(tree.get_nodes_by_operator("design_matrix").len(), 4);

  let ranked = ranked(&results);
  let linear_errors = ranked
    .iter()
    .filter(|(_, node)| tree.get_path_str(*node).unwrap().contains("linear_model"))
    .count();
  assert_eq!(linear_errors, 4);
  // Every linear branch beats every mean branch.
  for (_, node) in &ranked[..4] {
    assert!(tree.get_path_str(*node).unwrap().contains("linear_model"));
  }
}

#[test]
fn test_forecast_tree_survives_snapshot() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let csv = dir.path().join("trend.csv");
  write_trend(&csv);

  let mut tree = TransformationTree::new(registry().unwrap(), ROOT_OPERATOR).unwrap();
  build(&mut tree, &csv);
  let expected = tree.execute_tree().unwrap().to_vec();

  let snapshot = dir.path().join("forecast.json");
  save(&tree, &snapshot).unwrap();
  let mut restored = load(&snapshot, registry().unwrap()).unwrap();

  assert_eq!(restored.execute_tree().unwrap(), expected.as_slice());
}

#[test]
fn test_missing_csv_aborts_execution() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");

  let mut tree = TransformationTree::new(registry().unwrap(), ROOT_OPERATOR).unwrap();
  build(&mut tree, &dir.path().join("absent.csv"));

  let err = tree.execute_tree().unwrap_err();
  assert!(err.to_string().contains("read_csv"), "{err}");
}

#[test]
fn test_write_csv_sink() {
  let dir = tempfile::tempdir().expect("failed to create temp dir");
  let csv = dir.path().join("trend.csv");
  let out = dir.path().join("scaled.csv");
  write_trend(&csv);

  let mut tree = TransformationTree::new(registry().unwrap(), ROOT_OPERATOR).unwrap();
  let read = tree
    .add_operator(
      tree.root(),
      NodeSpec::new("read_csv").args([json!(csv.to_str().unwrap())]),
    )
    .unwrap();
  let clipped = tree
    .add_operator(read, NodeSpec::new("clip").args([json!(0), json!(3)]))
    .unwrap();
  let scaled = tree
    .add_operator(clipped, NodeSpec::new("scale").save_result(true))
    .unwrap();
  tree
    .add_operator(scaled, NodeSpec::new("write_csv").args([json!(out.to_str().unwrap())]))
    .unwrap();

  let results = tree.execute_tree().unwrap();
  assert_eq!(results[0].0, Output::Single(json!([0.0, 0.5, 1.0])));
  assert_eq!(fs::read_to_string(&out).unwrap(), "value\n0\n0.5\n1\n");
}

#[test]
fn test_model_without_training_data_is_rejected() {
  let mut tree = TransformationTree::new(registry().unwrap(), ROOT_OPERATOR).unwrap();
  let model = tree
    .add_operator(tree.root(), NodeSpec::new("linear_model"))
    .unwrap();

  let err = tree.add_operator(model, NodeSpec::new("fit")).unwrap_err();
  assert!(err.to_string().contains("x_train"), "{err}");
}

#[test]
fn test_demo_definition_builds() {
  let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/temperature.json");
  let def = pipetree_config::PipelineDef::from_file(&path).unwrap();

  let tree = pipetree_config::build_tree(&def, registry().unwrap()).unwrap();

  assert_eq!(tree.len(), def.node_count() + 1);
  assert_eq!(tree.get_nodes_by_operator("design_matrix").len(), 3);
  assert_eq!(tree.get_nodes_by_tag("mse").len(), 6);
}

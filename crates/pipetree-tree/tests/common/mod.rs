//! Shared fixtures for tree integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pipetree_operator::{Operator, OperatorError, OperatorKind, OperatorRegistry, Output, Signature};
use pipetree_tree::{NodeId, NodeSpec, TransformationTree};
use serde_json::{Value, json};

/// Every invocation as (operator name, arguments).
pub type CallLog = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

/// Operator that records its calls before running `body`.
struct Recorded<F> {
  signature: Signature,
  log: CallLog,
  body: F,
}

impl<F> Operator for Recorded<F>
where
  F: Fn(&[Value]) -> Result<Output, OperatorError> + Send + Sync,
{
  fn signature(&self) -> &Signature {
    &self.signature
  }

  fn invoke(&self, args: Vec<Value>) -> Result<Output, OperatorError> {
    self
      .log
      .lock()
      .unwrap()
      .push((self.signature.name.clone(), args.clone()));
    (self.body)(&args)
  }
}

pub struct Fixture {
  pub registry: OperatorRegistry,
  pub log: CallLog,
}

impl Fixture {
  pub fn empty() -> Self {
    Self {
      registry: OperatorRegistry::new(),
      log: Arc::default(),
    }
  }

  pub fn add<F>(&mut self, name: &str, inputs: &[&str], outputs: &[&str], body: F)
  where
    F: Fn(&[Value]) -> Result<Output, OperatorError> + Send + Sync + 'static,
  {
    self
      .registry
      .register(Recorded {
        signature: Signature::new(name, OperatorKind::Preprocess)
          .inputs(inputs.iter().copied())
          .outputs(outputs.iter().copied()),
        log: Arc::clone(&self.log),
        body,
      })
      .unwrap();
  }

  /// Operators of the read -> denoise -> split -> model -> evaluate scenario,
  /// plus a few misbehaving ones.
  pub fn new() -> Self {
    let mut fixture = Self::empty();

    fixture.add("start", &[], &[], |_| Ok(Output::None));
    fixture.add("read", &[], &["data"], |args| {
      Ok(Output::Single(
        args.first().cloned().unwrap_or(json!([1.0, 2.0, 3.0, 4.0])),
      ))
    });
    fixture.add("denoise", &["data"], &["data"], |args| {
      Ok(Output::Single(args[0].clone()))
    });
    fixture.add("scale", &["data"], &["data"], |args| {
      let factor = args[1].as_f64().unwrap();
      let scaled: Vec<f64> = numbers(&args[0]).iter().map(|v| v * factor).collect();
      Ok(Output::Single(json!(scaled)))
    });
    fixture.add("split", &["data"], &["train", "test"], |args| {
      let data = numbers(&args[0]);
      let (train, test) = data.split_at(data.len() / 2);
      Ok(Output::Many(vec![json!(train), json!(test)]))
    });
    fixture.add("model_a", &["train"], &["model"], |_| {
      Ok(Output::Single(json!({ "name": "a", "bias": 1.0 })))
    });
    fixture.add("model_b", &["train"], &["model"], |_| {
      Ok(Output::Single(json!({ "name": "b", "bias": 2.0 })))
    });
    fixture.add("evaluate", &["model", "test"], &["score"], |args| {
      let bias = args[0]["bias"].as_f64().unwrap();
      let total: f64 = numbers(&args[1]).iter().sum();
      Ok(Output::Single(json!(total + bias)))
    });
    fixture.add("needs_model", &["model"], &["score"], |_| {
      Ok(Output::Single(json!(0.0)))
    });
    fixture.add("emit_extra", &["data"], &["extra"], |_| {
      Ok(Output::Single(json!("extra")))
    });
    fixture.add("use_extra", &["extra"], &["data"], |args| {
      Ok(Output::Single(args[0].clone()))
    });
    fixture.add("count", &["data"], &["count"], |args| {
      Ok(Output::Single(json!(numbers(&args[0]).len())))
    });
    fixture.add("pair", &["data"], &["left", "right"], |args| {
      Ok(Output::Single(args[0].clone()))
    });
    fixture.add("sink", &["data"], &[], |_| Ok(Output::None));
    fixture.add("boom", &["data"], &[], |_| {
      Err(OperatorError::failed("boom"))
    });

    fixture
  }

  pub fn tree(&self) -> TransformationTree {
    TransformationTree::new(self.registry.clone(), "start").unwrap()
  }

  /// Names of invoked operators, in call order.
  pub fn calls(&self) -> Vec<String> {
    self
      .log
      .lock()
      .unwrap()
      .iter()
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Arguments of every call to `name`.
  pub fn calls_to(&self, name: &str) -> Vec<Vec<Value>> {
    self
      .log
      .lock()
      .unwrap()
      .iter()
      .filter(|(n, _)| n == name)
      .map(|(_, args)| args.clone())
      .collect()
  }

  pub fn clear_calls(&self) {
    self.log.lock().unwrap().clear();
  }
}

pub fn numbers(value: &Value) -> Vec<f64> {
  value
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v.as_f64().unwrap())
    .collect()
}

/// Node handles of the two-model scenario.
pub struct Scenario {
  pub read: NodeId,
  pub denoise: NodeId,
  pub split: NodeId,
  pub model_a: NodeId,
  pub model_b: NodeId,
  pub eval_a: NodeId,
  pub eval_b: NodeId,
}

/// root -> read -> denoise -> split -> {model_a, model_b} -> evaluate.
pub fn build_scenario(tree: &mut TransformationTree) -> Scenario {
  let root = tree.root();
  let read = tree
    .add_operator(root, NodeSpec::new("read").tag("read"))
    .unwrap();
  let denoise = tree.add_operator(read, NodeSpec::new("denoise")).unwrap();
  let split = tree
    .add_operator(denoise, NodeSpec::new("split").tag("split"))
    .unwrap();
  let model_a = tree
    .add_operator(split, NodeSpec::new("model_a").tag("model"))
    .unwrap();
  let model_b = tree
    .add_operator(split, NodeSpec::new("model_b").tag("model"))
    .unwrap();
  let eval_a = tree
    .add_operator(model_a, NodeSpec::new("evaluate").tag("score").save_result(true))
    .unwrap();
  let eval_b = tree
    .add_operator(model_b, NodeSpec::new("evaluate").tag("score").save_result(true))
    .unwrap();

  Scenario {
    read,
    denoise,
    split,
    model_a,
    model_b,
    eval_a,
    eval_b,
  }
}

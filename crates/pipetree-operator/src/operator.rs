use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperatorError;

/// Broad role of an operator inside a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
  /// Produces data from outside the pipeline.
  Source,
  /// Transforms data already on the branch.
  Preprocess,
  /// Constructs an untrained model.
  Model,
  /// Trains a model.
  Fit,
  /// Produces forecasts from a trained model.
  Predict,
  /// Scores forecasts.
  Metric,
  /// Consumes data without producing new keys.
  Sink,
}

impl fmt::Display for OperatorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Source => "source",
      Self::Preprocess => "preprocess",
      Self::Model => "model",
      Self::Fit => "fit",
      Self::Predict => "predict",
      Self::Metric => "metric",
      Self::Sink => "sink",
    };
    f.pad(s)
  }
}

/// Static key contract of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
  /// Unique operator name. This is the operator's identity within a registry.
  pub name: String,
  pub kind: OperatorKind,
  /// Keys read from branch state, in positional binding order.
  #[serde(default)]
  pub inputs: Vec<String>,
  /// Keys populated from the result, in unpacking order.
  #[serde(default)]
  pub outputs: Vec<String>,
}

impl Signature {
  pub fn new(name: impl Into<String>, kind: OperatorKind) -> Self {
    Self {
      name: name.into(),
      kind,
      inputs: Vec::new(),
      outputs: Vec::new(),
    }
  }

  pub fn inputs<I, S>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.inputs = keys.into_iter().map(Into::into).collect();
    self
  }

  pub fn outputs<I, S>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.outputs = keys.into_iter().map(Into::into).collect();
    self
  }
}

/// The values produced by one operator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "arity", content = "values", rename_all = "snake_case")]
pub enum Output {
  /// Zero values.
  None,
  /// Exactly one value.
  Single(Value),
  /// An ordered sequence of values.
  Many(Vec<Value>),
}

impl Output {
  /// Normalize a loosely shaped value: `null` is zero values, an array is one
  /// value per element, anything else is a single value.
  pub fn from_value(value: Value) -> Self {
    match value {
      Value::Null => Self::None,
      Value::Array(values) => Self::Many(values),
      other => Self::Single(other),
    }
  }

  /// Number of values produced.
  pub fn arity(&self) -> usize {
    match self {
      Self::None => 0,
      Self::Single(_) => 1,
      Self::Many(values) => values.len(),
    }
  }

  pub fn into_values(self) -> Vec<Value> {
    match self {
      Self::None => Vec::new(),
      Self::Single(value) => vec![value],
      Self::Many(values) => values,
    }
  }

  /// The numeric value of a single-valued output, if it is a number.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Single(value) => value.as_f64(),
      _ => None,
    }
  }
}

impl fmt::Display for Output {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::None => f.write_str("()"),
      Self::Single(value) => write!(f, "{}", value),
      Self::Many(values) => write!(f, "{}", Value::Array(values.clone())),
    }
  }
}

/// A registered unit of computation.
///
/// Implementations receive the values bound from branch state (in
/// `signature().inputs` order) followed by the node's fixed arguments.
pub trait Operator: Send + Sync {
  fn signature(&self) -> &Signature;

  fn invoke(&self, args: Vec<Value>) -> Result<Output, OperatorError>;

  fn name(&self) -> &str {
    &self.signature().name
  }
}

/// An operator backed by a plain function or closure.
pub struct FnOperator<F> {
  signature: Signature,
  func: F,
}

impl<F> FnOperator<F>
where
  F: Fn(Vec<Value>) -> Result<Output, OperatorError> + Send + Sync,
{
  pub fn new(signature: Signature, func: F) -> Self {
    Self { signature, func }
  }
}

impl<F> Operator for FnOperator<F>
where
  F: Fn(Vec<Value>) -> Result<Output, OperatorError> + Send + Sync,
{
  fn signature(&self) -> &Signature {
    &self.signature
  }

  fn invoke(&self, args: Vec<Value>) -> Result<Output, OperatorError> {
    (self.func)(args)
  }
}

impl<F> fmt::Debug for FnOperator<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FnOperator")
      .field("signature", &self.signature)
      .finish_non_exhaustive()
  }
}

//! Forecasting models: construction, fitting and prediction.

use pipetree_operator::{Args, OperatorError, OperatorKind, OperatorRegistry, Output, RegistryError, Signature, Value};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::series::{define, to_value};

/// Diagonal regularization keeping the normal equations solvable when
/// features are collinear.
const RIDGE: f64 = 1e-9;

/// An untrained model, as produced by a model operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Model {
  /// Always forecasts the mean of the training targets.
  Mean,
  /// Ordinary least squares over the window features.
  Linear,
}

/// A model with learned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainedModel {
  Mean { mean: f64 },
  Linear { weights: Vec<f64>, bias: f64 },
}

pub(crate) fn register(registry: &mut OperatorRegistry) -> Result<(), RegistryError> {
  for (name, model) in [("mean_model", Model::Mean), ("linear_model", Model::Linear)] {
    define(
      registry,
      Signature::new(name, OperatorKind::Model).outputs(["model"]),
      move |_| Ok(Output::Single(encode(&model)?)),
    )?;
  }

  define(
    registry,
    Signature::new("fit", OperatorKind::Fit)
      .inputs(["model", "x_train", "y_train"])
      .outputs(["trained_model"]),
    |values| {
      let args = Args::new(&values);
      let model: Model = decode(&args, 0, "model")?;
      let trained = fit(model, &args.matrix(1, "x_train")?, &args.series(2, "y_train")?)?;
      Ok(Output::Single(encode(&trained)?))
    },
  )?;

  define(
    registry,
    Signature::new("predict", OperatorKind::Predict)
      .inputs(["trained_model", "x_test"])
      .outputs(["y_forecast"]),
    |values| {
      let args = Args::new(&values);
      let model: TrainedModel = decode(&args, 0, "trained_model")?;
      let forecast = predict(&model, &args.matrix(1, "x_test")?)?;
      Ok(Output::Single(to_value(&forecast)))
    },
  )
}

fn encode<T: Serialize>(value: &T) -> Result<Value, OperatorError> {
  serde_json::to_value(value).map_err(|e| OperatorError::failed(e.to_string()))
}

fn decode<T: DeserializeOwned>(args: &Args<'_>, index: usize, name: &'static str) -> Result<T, OperatorError> {
  let value = args.required(index, name)?;
  T::deserialize(value).map_err(|e| OperatorError::InvalidArgument {
    index,
    name,
    message: e.to_string(),
  })
}

/// Fit `model` to rows `x` and targets `y`.
pub fn fit(model: Model, x: &[Vec<f64>], y: &[f64]) -> Result<TrainedModel, OperatorError> {
  if x.len() != y.len() {
    return Err(OperatorError::failed(format!(
      "{} feature rows but {} targets",
      x.len(),
      y.len()
    )));
  }
  if y.is_empty() {
    return Err(OperatorError::failed("cannot fit a model without training rows"));
  }

  match model {
    Model::Mean => Ok(TrainedModel::Mean {
      mean: y.iter().sum::<f64>() / y.len() as f64,
    }),
    Model::Linear => fit_linear(x, y),
  }
}

fn fit_linear(x: &[Vec<f64>], y: &[f64]) -> Result<TrainedModel, OperatorError> {
  let features = x[0].len();
  if x.iter().any(|row| row.len() != features) {
    return Err(OperatorError::failed("feature rows differ in length"));
  }

  // Normal equations over [features..., 1] so the last coefficient is the bias.
  let n = features + 1;
  let mut gram = vec![vec![0.0; n]; n];
  let mut rhs = vec![0.0; n];
  for (row, &target) in x.iter().zip(y) {
    let augmented: Vec<f64> = row.iter().copied().chain([1.0]).collect();
    for i in 0..n {
      rhs[i] += augmented[i] * target;
      for j in 0..n {
        gram[i][j] += augmented[i] * augmented[j];
      }
    }
  }
  for (i, row) in gram.iter_mut().enumerate() {
    row[i] += RIDGE;
  }

  let mut coefficients = solve(gram, rhs)?;
  let bias = coefficients.pop().unwrap_or(0.0);
  Ok(TrainedModel::Linear {
    weights: coefficients,
    bias,
  })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, OperatorError> {
  let n = b.len();
  for col in 0..n {
    let pivot = (col..n)
      .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
      .unwrap_or(col);
    if a[pivot][col].abs() < f64::EPSILON {
      return Err(OperatorError::failed("linear system is singular"));
    }
    a.swap(col, pivot);
    b.swap(col, pivot);

    for row in col + 1..n {
      let factor = a[row][col] / a[col][col];
      for k in col..n {
        a[row][k] -= factor * a[col][k];
      }
      b[row] -= factor * b[col];
    }
  }

  let mut x = vec![0.0; n];
  for row in (0..n).rev() {
    let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
    x[row] = (b[row] - tail) / a[row][row];
  }
  Ok(x)
}

/// Forecast one value per row of `x`.
pub fn predict(model: &TrainedModel, x: &[Vec<f64>]) -> Result<Vec<f64>, OperatorError> {
  match model {
    TrainedModel::Mean { mean } => Ok(vec![*mean; x.len()]),
    TrainedModel::Linear { weights, bias } => x
      .iter()
      .map(|row| {
        if row.len() != weights.len() {
          return Err(OperatorError::failed(format!(
            "model expects {} features, row has {}",
            weights.len(),
            row.len()
          )));
        }
        Ok(row.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() + bias)
      })
      .collect(),
  }
}

//! Pipetree Time Series
//!
//! Operators for time-series forecasting experiments. A series travels
//! through the tree as a JSON array of numbers, with `null` marking a missing
//! sample. Models are JSON objects, so every intermediate value can be saved
//! as a result or written into a snapshot.
//!
//! Branch keys:
//! - `series_source` -> `series` via `read_csv`
//! - `series` through any number of preprocessing steps
//! - `series` -> `x_train`, `y_train`, `x_test`, `y_test` via `design_matrix`
//! - `model` + training matrices -> `trained_model` -> `y_forecast`
//! - `y_test` + `y_forecast` -> `error` via the metric operators

mod io;
mod metrics;
mod model;
mod preprocess;
mod series;

use pipetree_operator::{OperatorRegistry, RegistryError};

pub use metrics::{mape, mse, smape};
pub use model::{Model, TrainedModel, fit, predict};
pub use preprocess::{
  DesignMatrix, clip, cubic_root, denoise, design_matrix, difference, impute_missing, impute_outliers,
  logarithm, longest_continuous_run, scale, standardize,
};

/// Name of the root operator for time-series trees.
pub const ROOT_OPERATOR: &str = "time_series";

/// Register every time-series operator in `registry`.
pub fn register_all(registry: &mut OperatorRegistry) -> Result<(), RegistryError> {
  io::register(registry)?;
  preprocess::register(registry)?;
  model::register(registry)?;
  metrics::register(registry)?;
  Ok(())
}

/// A registry holding exactly the time-series operators.
pub fn registry() -> Result<OperatorRegistry, RegistryError> {
  let mut registry = OperatorRegistry::new();
  register_all(&mut registry)?;
  Ok(registry)
}

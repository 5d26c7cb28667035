//! Forecast error metrics. Lower is better for all of them.

use pipetree_operator::{Args, OperatorError, OperatorKind, OperatorRegistry, Output, RegistryError, Signature};
use serde_json::json;

use crate::series::define;

pub(crate) fn register(registry: &mut OperatorRegistry) -> Result<(), RegistryError> {
  let metrics: [(&str, fn(&[f64], &[f64]) -> Result<f64, OperatorError>); 3] =
    [("mse", mse), ("mape", mape), ("smape", smape)];

  for (name, metric) in metrics {
    define(
      registry,
      Signature::new(name, OperatorKind::Metric)
        .inputs(["y_test", "y_forecast"])
        .outputs(["error"]),
      move |values| {
        let args = Args::new(&values);
        let error = metric(&args.series(0, "y_test")?, &args.series(1, "y_forecast")?)?;
        if !error.is_finite() {
          return Err(OperatorError::failed(format!(
            "{name} is not finite ({error}); check for missing actual or forecast values"
          )));
        }
        Ok(Output::Single(json!(error)))
      },
    )?;
  }
  Ok(())
}

fn paired<'a>(actual: &'a [f64], forecast: &'a [f64]) -> Result<impl Iterator<Item = (f64, f64)> + 'a, OperatorError> {
  if actual.len() != forecast.len() {
    return Err(OperatorError::failed(format!(
      "{} actual values but {} forecasts",
      actual.len(),
      forecast.len()
    )));
  }
  if actual.is_empty() {
    return Err(OperatorError::failed("no values to compare"));
  }
  Ok(actual.iter().copied().zip(forecast.iter().copied()))
}

/// Mean squared error.
pub fn mse(actual: &[f64], forecast: &[f64]) -> Result<f64, OperatorError> {
  let total: f64 = paired(actual, forecast)?.map(|(a, f)| (a - f).powi(2)).sum();
  Ok(total / actual.len() as f64)
}

/// Mean absolute percentage error, in percent. Undefined when an actual
/// value is zero.
pub fn mape(actual: &[f64], forecast: &[f64]) -> Result<f64, OperatorError> {
  let mut total = 0.0;
  for (a, f) in paired(actual, forecast)? {
    if a == 0.0 {
      return Err(OperatorError::failed("mape is undefined when an actual value is zero"));
    }
    total += ((a - f) / a).abs();
  }
  Ok(100.0 * total / actual.len() as f64)
}

/// Symmetric mean absolute percentage error, in percent. Pairs where both
/// values are zero count as exact.
pub fn smape(actual: &[f64], forecast: &[f64]) -> Result<f64, OperatorError> {
  let total: f64 = paired(actual, forecast)?
    .map(|(a, f)| {
      let denominator = a.abs() + f.abs();
      if denominator == 0.0 {
        0.0
      } else {
        2.0 * (f - a).abs() / denominator
      }
    })
    .sum();
  Ok(100.0 * total / actual.len() as f64)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mse() {
    assert_eq!(mse(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap(), 0.0);
    assert_eq!(mse(&[1.0, 2.0], &[2.0, 4.0]).unwrap(), 2.5);
  }

  #[test]
  fn test_mape() {
    assert!((mape(&[100.0, 200.0], &[110.0, 180.0]).unwrap() - 10.0).abs() < 1e-9);
    assert!(mape(&[0.0], &[1.0]).is_err());
  }

  #[test]
  fn test_smape() {
    assert_eq!(smape(&[0.0, 1.0], &[0.0, 1.0]).unwrap(), 0.0);
    // |3 - 1| * 2 / (1 + 3) = 1
    assert_eq!(smape(&[1.0], &[3.0]).unwrap(), 100.0);
  }

  #[test]
  fn test_shape_errors() {
    assert!(mse(&[1.0], &[1.0, 2.0]).is_err());
    assert!(smape(&[], &[]).is_err());
  }

  #[test]
  fn test_metric_operator() {
    let mut registry = OperatorRegistry::new();
    register(&mut registry).unwrap();

    let out = registry
      .get("mse")
      .unwrap()
      .invoke(vec![json!([1.0, 2.0]), json!([2.0, 4.0])])
      .unwrap();
    assert_eq!(out.as_f64(), Some(2.5));
  }

  #[test]
  fn test_missing_forecast_fails_the_metric() {
    let mut registry = OperatorRegistry::new();
    register(&mut registry).unwrap();

    for name in ["mse", "mape", "smape"] {
      let err = registry
        .get(name)
        .unwrap()
        .invoke(vec![json!([1.0, 2.0]), json!([1.0, null])])
        .unwrap_err();
      assert!(err.to_string().contains("not finite"), "{name}: {err}");
    }
  }
}

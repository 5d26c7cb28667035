use pipetree_operator::{
  FnOperator, OperatorError, OperatorRegistry, Output, RegistryError, Signature, Value,
};

/// Encode a series, turning `NaN` back into `null`.
pub(crate) fn to_value(series: &[f64]) -> Value {
  Value::Array(
    series
      .iter()
      .map(|&v| serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number))
      .collect(),
  )
}

pub(crate) fn matrix_to_value(rows: &[Vec<f64>]) -> Value {
  Value::Array(rows.iter().map(|row| to_value(row)).collect())
}

/// Register a closure-backed operator.
pub(crate) fn define<F>(
  registry: &mut OperatorRegistry,
  signature: Signature,
  func: F,
) -> Result<(), RegistryError>
where
  F: Fn(Vec<Value>) -> Result<Output, OperatorError> + Send + Sync + 'static,
{
  registry.register(FnOperator::new(signature, func))
}

pub(crate) fn has_missing(series: &[f64]) -> bool {
  series.iter().any(|v| v.is_nan())
}

/// Mean of the present samples, if there are any.
pub(crate) fn mean(series: &[f64]) -> Option<f64> {
  let present: Vec<f64> = series.iter().copied().filter(|v| !v.is_nan()).collect();
  if present.is_empty() {
    return None;
  }
  Some(present.iter().sum::<f64>() / present.len() as f64)
}
